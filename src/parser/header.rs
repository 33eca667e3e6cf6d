//! RFC 5322 header handling: folding, encoded-words (RFC 2047), and date parsing.
//!
//! Everything here is tolerant. Header text produced by non-conformant
//! senders degrades to a best-effort string instead of an error; only
//! [`parse_date`] reports failure, and it is up to the caller to treat that
//! as fatal.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Utc};
use tracing::warn;

/// Base64 as found inside `B` encoded-words: padding optional, sloppy
/// trailing bits accepted.
const ENCODED_WORD_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Decode a header value that may still carry RFC 2047 encoded-words.
///
/// Never fails. Charsets named by the encoded-words are honored, unknown
/// charsets fall back to UTF-8, and undecodable bytes are dropped.
///
/// Example: `"=?ISO-8859-1?Q?caf=E9?="` → `"café"`
pub fn decode_header_text(value: &str) -> String {
    decode_encoded_words(value)
}

/// Decode a header value given as raw bytes of unknown encoding.
///
/// The bytes are read as ASCII, then UTF-8, then Latin-1, before the
/// encoded-words are resolved with [`decode_header_text`].
pub fn decode_header_value(raw: &[u8]) -> String {
    decode_header_text(&decode_header_bytes(raw))
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first (which covers plain ASCII), then falls back to
/// Latin-1, which accepts every byte.
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF".as_slice()).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            decoded.into_owned()
        }
    }
}

/// Find the byte offset where headers end (position of the first blank line).
pub fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}

/// Unfold the header section of a raw message.
///
/// Returns `(lowercase_name, raw_value)` pairs in message order.
pub fn parse_header_block(raw_message: &[u8]) -> Vec<(String, String)> {
    let end = find_header_end(raw_message).unwrap_or(raw_message.len());
    unfold_headers(&decode_header_bytes(&raw_message[..end]))
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
pub fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Get the first value for a header name (case-insensitive).
pub fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // If the gap between two encoded words is only whitespace, skip it (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start) {
            result.push_str(&decoded.text);
            remaining = &remaining[start + 2 + decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => ENCODED_WORD_B64.decode(encoded_text.trim()).ok()?,
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    let text = decode_charset(charset, &bytes);

    Some(DecodedWord {
        text,
        consumed: total_consumed,
    })
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset, dropping anything undecodable.
///
/// Unknown charsets fall back to UTF-8.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    // RFC 2231 allows a language suffix: "utf-8*en"
    let label = charset.split('*').next().unwrap_or(charset).trim();
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).unwrap_or_else(|| {
        warn!(charset = charset, "Unknown charset, falling back to UTF-8");
        encoding_rs::UTF_8
    });

    let (decoded, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        decoded
            .chars()
            .filter(|&c| c != char::REPLACEMENT_CHARACTER)
            .collect()
    } else {
        decoded.into_owned()
    }
}

/// Parse a `Date:` header value.
///
/// RFC 5322 dates (including the obsolete named zones such as `EST`) go
/// through chrono; anything chrono rejects gets one more chance with
/// mail-parser's lenient RFC 822 reader, which copes with missing commas,
/// trailing comments and two-digit years. Ambiguous numeric forms such as
/// `03/04/2024` are rejected.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    let lenient = mail_parser::DateTime::parse_rfc822(trimmed)
        .filter(mail_parser::DateTime::is_valid)
        .and_then(|dt| DateTime::from_timestamp(dt.to_timestamp(), 0));
    if lenient.is_none() {
        warn!(date = trimmed, "Could not parse date");
    }
    lenient
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        assert_eq!(decode_header_text("=?UTF-8?B?SG9sYSBtdW5kbw==?="), "Hola mundo");
    }

    #[test]
    fn test_decode_base64_without_padding() {
        assert_eq!(decode_header_text("=?UTF-8?B?SG9sYSBtdW5kbw?="), "Hola mundo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        assert_eq!(decode_header_text("=?ISO-8859-1?Q?caf=E9?="), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?=";
        assert_eq!(decode_header_text(input), "Hola mundo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?SG9sYQ==?= there";
        assert_eq!(decode_header_text(input), "Re: Hola there");
    }

    #[test]
    fn test_decode_plain_passthrough() {
        assert_eq!(decode_header_text("Quarterly report"), "Quarterly report");
        assert_eq!(decode_header_text(""), "");
    }

    #[test]
    fn test_decode_unknown_charset_falls_back_to_utf8() {
        assert_eq!(decode_header_text("=?x-klingon?Q?hello?="), "hello");
    }

    #[test]
    fn test_decode_drops_undecodable_bytes() {
        // 0xFF is never valid UTF-8
        assert_eq!(decode_header_text("=?UTF-8?Q?ab=FFcd?="), "abcd");
    }

    #[test]
    fn test_decode_malformed_word_is_preserved() {
        assert_eq!(decode_header_text("=?UTF-8?X?abc?="), "=?UTF-8?X?abc?=");
        assert_eq!(decode_header_text("50% off =?"), "50% off =?");
    }

    #[test]
    fn test_decode_header_value_latin1_bytes() {
        // "Müller" in Latin-1 is not valid UTF-8
        assert_eq!(decode_header_value(b"M\xFCller"), "Müller");
    }

    #[test]
    fn test_decode_header_value_utf8_bytes() {
        assert_eq!(decode_header_value("山田太郎".as_bytes()), "山田太郎");
    }

    #[test]
    fn test_decode_utf8_base64_japanese() {
        assert_eq!(decode_header_text("=?UTF-8?B?5bGx55Sw5aSq6YOO?="), "山田太郎");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        assert_eq!(decode_header_text("=?Windows-1252?Q?M=FCller?="), "Müller");
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_parse_header_block_stops_at_body() {
        let raw = b"Subject: Hi\r\nX-Trap: no\r\n\r\nNot-A-Header: body\r\n";
        let headers = parse_header_block(raw);
        assert_eq!(headers.len(), 2);
        assert_eq!(get_header(&headers, "X-TRAP"), Some("no"));
        assert_eq!(get_header(&headers, "not-a-header"), None);
    }

    #[test]
    fn test_find_header_end() {
        let data = b"From: a@b.com\nSubject: Hi\n\nBody\n";
        assert_eq!(find_header_end(data), Some(25));
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        assert_eq!(find_header_end(data), Some(26));
    }

    #[test]
    fn test_parse_date_rfc2822() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");
    }

    #[test]
    fn test_parse_date_offset_normalized_to_utc() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 +0200").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "08:00");
    }

    #[test]
    fn test_parse_date_named_tz() {
        let dt = parse_date("Thu, 04 Jan 2024 10:00:00 EST").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "15:00");
    }

    #[test]
    fn test_parse_date_lenient_forms() {
        // No day-of-week comma, trailing zone comment
        let dt = parse_date("Thu 04 Jan 2024 10:00:00 +0000 (UTC)").unwrap();
        assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2024-01-04 10:00");
    }

    #[test]
    fn test_parse_date_rejects_ambiguous_numeric() {
        assert!(parse_date("03/04/2024 10:00:00").is_none());
        assert!(parse_date("16-JUL-2025").is_none());
    }

    #[test]
    fn test_parse_date_garbage() {
        assert!(parse_date("").is_none());
        assert!(parse_date("   ").is_none());
    }
}
