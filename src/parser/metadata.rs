//! Extraction of IMAP/Gmail annotations from the literal text of a fetch
//! response: `FLAGS (...)`, `X-GM-LABELS (...)`, `X-GM-THRID n`, `X-GM-MSGID n`.
//!
//! Each field is extracted independently. A missing or malformed annotation
//! yields an empty set or `None` for that field and never an error.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use super::mutf7;

static FLAGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(])FLAGS \(([^)]*)\)").expect("FLAGS pattern is valid")
});

static LABELS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"X-GM-LABELS \(").expect("X-GM-LABELS pattern is valid"));

static THRID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"X-GM-THRID (\d+)").expect("X-GM-THRID pattern is valid"));

static MSGID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"X-GM-MSGID (\d+)").expect("X-GM-MSGID pattern is valid"));

/// Everything the annotation half of a fetch response says about a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Flags without their leading backslash (`\Seen` → `Seen`).
    pub flags: BTreeSet<String>,
    /// Gmail labels, unquoted and unescaped.
    pub labels: BTreeSet<String>,
    /// Gmail thread id (`X-GM-THRID`).
    pub thread_id: Option<String>,
    /// Gmail message id (`X-GM-MSGID`).
    pub message_id: Option<String>,
}

/// Run every extractor over one fetch response line.
pub fn extract_metadata(header_text: &str) -> Metadata {
    Metadata {
        flags: parse_flags(header_text),
        labels: parse_labels(header_text).into_iter().collect(),
        thread_id: parse_thread_id(header_text),
        message_id: parse_message_id(header_text),
    }
}

/// Parse the `FLAGS (...)` list, dropping the protocol backslash.
///
/// When the text carries several lists the last one wins.
pub fn parse_flags(header_text: &str) -> BTreeSet<String> {
    FLAGS_RE
        .captures_iter(header_text)
        .last()
        .map(|caps| {
            caps[1]
                .split_whitespace()
                .map(|flag| flag.strip_prefix('\\').unwrap_or(flag).to_string())
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the `X-GM-LABELS (...)` list.
///
/// Labels may be atoms (`\Inbox`), quoted strings (`"Work Stuff"`) or carry
/// modified UTF-7 (`"caf&AOk-"`). Returns an empty list when the annotation
/// is absent.
pub fn parse_labels(header_text: &str) -> Vec<String> {
    let Some(open) = LABELS_RE.find(header_text) else {
        return Vec::new();
    };

    split_label_tokens(&header_text[open.end()..])
        .into_iter()
        .map(|token| normalize_label(&token))
        .filter(|label| !label.is_empty())
        .collect()
}

/// `X-GM-THRID`, if present.
pub fn parse_thread_id(header_text: &str) -> Option<String> {
    THRID_RE.captures(header_text).map(|caps| caps[1].to_string())
}

/// `X-GM-MSGID`, if present.
pub fn parse_message_id(header_text: &str) -> Option<String> {
    MSGID_RE.captures(header_text).map(|caps| caps[1].to_string())
}

/// Undo IMAP quoted-string escaping: `\"` → `"`, `\\` → `\`.
///
/// A backslash before any other character is kept as-is, as is a trailing
/// lone backslash.
pub fn unescape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(next @ ('"' | '\\')) => out.push(next),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Split a label list on spaces that are outside quoted strings.
///
/// `list` starts right after the opening parenthesis; the first unquoted
/// `)` ends the list.
fn split_label_tokens(list: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for ch in list.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes => {
                escaped = true;
                current.push(ch);
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ')' if !in_quotes => break,
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Turn one raw label token into its plain form.
fn normalize_label(token: &str) -> String {
    let unquoted = match token
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    {
        Some(inner) => unescape_quoted(inner),
        None => token.trim_matches('"').to_string(),
    };
    let plain = unquoted.strip_prefix('\\').unwrap_or(&unquoted);
    mutf7::decode(plain).unwrap_or_else(|| plain.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"1 (X-GM-THRID 1278455344230334865 X-GM-MSGID 1278455344230334866 X-GM-LABELS (\Inbox \Important "Work" "Big \"Deal\"") UID 7 FLAGS (\Seen \Flagged $Forwarded) BODY[] {1234}"#;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_all_fields() {
        let meta = extract_metadata(RESPONSE);
        assert_eq!(meta.flags, set(&["Seen", "Flagged", "$Forwarded"]));
        assert_eq!(
            meta.labels,
            set(&["Inbox", "Important", "Work", "Big \"Deal\""])
        );
        assert_eq!(meta.thread_id.as_deref(), Some("1278455344230334865"));
        assert_eq!(meta.message_id.as_deref(), Some("1278455344230334866"));
    }

    #[test]
    fn test_empty_text_yields_defaults() {
        assert_eq!(extract_metadata(""), Metadata::default());
    }

    #[test]
    fn test_flags_absent_or_empty() {
        assert!(parse_flags("1 (UID 5)").is_empty());
        assert!(parse_flags("1 (FLAGS ())").is_empty());
    }

    #[test]
    fn test_flags_strip_backslash() {
        assert_eq!(
            parse_flags("1 (FLAGS (\\Seen \\Draft))"),
            set(&["Seen", "Draft"])
        );
    }

    #[test]
    fn test_flags_last_list_wins() {
        let text = "1 (FLAGS (\\Seen) UID 3 FLAGS (\\Deleted))";
        assert_eq!(parse_flags(text), set(&["Deleted"]));
    }

    #[test]
    fn test_labels_quoted() {
        assert_eq!(
            parse_labels(r#"X-GM-LABELS ("Important" "Work")"#),
            vec!["Important".to_string(), "Work".to_string()]
        );
    }

    #[test]
    fn test_labels_absent_or_empty() {
        assert!(parse_labels("1 (UID 5 FLAGS (\\Seen))").is_empty());
        assert!(parse_labels("X-GM-LABELS ()").is_empty());
    }

    #[test]
    fn test_labels_with_spaces_stay_whole() {
        assert_eq!(
            parse_labels(r#"X-GM-LABELS ("Project X" Receipts)"#),
            vec!["Project X".to_string(), "Receipts".to_string()]
        );
    }

    #[test]
    fn test_labels_parenthesised_quoted_label() {
        assert_eq!(
            parse_labels(r#"1 (X-GM-LABELS ("Work (old)" Receipts) UID 1 FLAGS (\Seen))"#),
            vec!["Work (old)", "Receipts"]
        );
    }

    #[test]
    fn test_labels_escaped_backslash() {
        assert_eq!(
            parse_labels(r#"X-GM-LABELS ("C:\\temp")"#),
            vec!["C:\\temp".to_string()]
        );
    }

    #[test]
    fn test_labels_modified_utf7() {
        assert_eq!(
            parse_labels(r#"X-GM-LABELS ("caf&AOk-")"#),
            vec!["café".to_string()]
        );
    }

    #[test]
    fn test_thread_id_absent_is_none() {
        assert_eq!(parse_thread_id("1 (UID 5)"), None);
        assert_eq!(parse_thread_id("X-GM-THRID abc"), None);
        assert_eq!(
            parse_thread_id("X-GM-THRID 123456789").as_deref(),
            Some("123456789")
        );
    }

    #[test]
    fn test_message_id() {
        assert_eq!(
            parse_message_id("X-GM-MSGID 42 X-GM-THRID 7").as_deref(),
            Some("42")
        );
        assert_eq!(parse_message_id("X-GM-THRID 7"), None);
    }

    #[test]
    fn test_unescape_quoted() {
        assert_eq!(unescape_quoted(r#"say \"hi\""#), r#"say "hi""#);
        assert_eq!(unescape_quoted(r"a\\b"), r"a\b");
        assert_eq!(unescape_quoted(r"\n"), r"\n");
        assert_eq!(unescape_quoted("tail\\"), "tail\\");
    }
}
