//! MIME tree walking: classifies every leaf part as attachment, HTML body,
//! plain-text body, or ignored, and decodes its payload.

use mail_parser::{MessagePart, MimeHeaders, PartType};
use tracing::trace;

use super::header::decode_header_text;
use crate::model::attachment::Attachment;

/// Maximum nesting depth for multipart and `message/rfc822` descent
/// (adversarial input can nest arbitrarily).
const MAX_DEPTH: usize = 10;

/// What a leaf part contributes to the materialized message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Attachment,
    Html,
    Text,
    Ignored,
}

/// The declared metadata classification looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct PartMeta<'a> {
    /// Filename from `Content-Disposition` or the `Content-Type` name.
    pub filename: Option<&'a str>,
    /// Raw `Content-Disposition` type (e.g. `"attachment"`, `"inline"`).
    pub disposition: Option<&'a str>,
    /// Lowercase `type/subtype`.
    pub content_type: &'a str,
}

/// Classify one leaf part. The first matching rule wins:
///
/// 1. a filename or an `attachment` disposition → [`PartKind::Attachment`]
/// 2. `text/html` → [`PartKind::Html`]
/// 3. `text/plain` → [`PartKind::Text`]
/// 4. anything else → [`PartKind::Ignored`]
pub fn classify(meta: &PartMeta<'_>) -> PartKind {
    let is_attachment = meta.filename.is_some()
        || meta
            .disposition
            .is_some_and(|d| d.to_ascii_lowercase().contains("attachment"));

    if is_attachment {
        PartKind::Attachment
    } else if meta.content_type.eq_ignore_ascii_case("text/html") {
        PartKind::Html
    } else if meta.content_type.eq_ignore_ascii_case("text/plain") {
        PartKind::Text
    } else {
        PartKind::Ignored
    }
}

/// Everything collected from one walk of a message's part tree.
///
/// Candidates are kept in tree order; the accessors return the last one,
/// since `multipart/alternative` puts the richest rendition last.
#[derive(Debug, Clone, Default)]
pub struct ParsedEmail {
    pub html_parts: Vec<String>,
    pub text_parts: Vec<String>,
    pub attachments: Vec<Attachment>,
}

impl ParsedEmail {
    /// The last HTML candidate, or `""`.
    pub fn html(&self) -> &str {
        self.html_parts.last().map(String::as_str).unwrap_or("")
    }

    /// The last plain-text candidate, or `""`.
    pub fn txt(&self) -> &str {
        self.text_parts.last().map(String::as_str).unwrap_or("")
    }
}

/// Walk a parsed message depth-first and classify every leaf exactly once.
///
/// A single-part message is treated as one leaf.
pub fn parse_parts(msg: &mail_parser::Message<'_>) -> ParsedEmail {
    let mut parsed = ParsedEmail::default();
    walk(msg, 0, 0, &mut parsed);
    parsed
}

fn walk(msg: &mail_parser::Message<'_>, part_id: usize, depth: usize, out: &mut ParsedEmail) {
    let Some(part) = msg.parts.get(part_id) else {
        return;
    };

    match &part.body {
        PartType::Multipart(children) => {
            if depth >= MAX_DEPTH {
                trace!(depth, "Multipart nesting too deep, skipping subtree");
                return;
            }
            for &child in children {
                walk(msg, child, depth + 1, out);
            }
        }
        PartType::Message(nested) => {
            if depth >= MAX_DEPTH {
                trace!(depth, "Nested message too deep, skipping");
                return;
            }
            walk(nested, 0, depth + 1, out);
        }
        _ => classify_leaf(part, out),
    }
}

fn classify_leaf(part: &MessagePart<'_>, out: &mut ParsedEmail) {
    let content_type = content_type_of(part);
    let meta = PartMeta {
        filename: part.attachment_name(),
        disposition: part.content_disposition().map(|d| d.ctype()),
        content_type: &content_type,
    };

    let kind = classify(&meta);
    trace!(content_type = %content_type, ?kind, "Classified MIME part");

    match kind {
        PartKind::Attachment => {
            let index = out.attachments.len();
            let name = meta
                .filename
                .map(decode_header_text)
                .unwrap_or_else(|| format!("attachment_{index}"));
            let content_type = part
                .content_type()
                .map(|_| content_type.clone())
                .unwrap_or_else(|| "application/octet-stream".to_string());
            out.attachments
                .push(Attachment::new(name, content_type, part.contents().to_vec()));
        }
        PartKind::Html => out.html_parts.push(text_payload(part)),
        PartKind::Text => out.text_parts.push(text_payload(part)),
        PartKind::Ignored => {}
    }
}

/// Lowercase `type/subtype`, defaulting to `text/plain` (RFC 2045 §5.2).
fn content_type_of(part: &MessagePart<'_>) -> String {
    part.content_type()
        .map(|ct| {
            let main = ct.ctype();
            match ct.subtype() {
                Some(sub) => format!("{main}/{sub}"),
                None => main.to_string(),
            }
        })
        .unwrap_or_else(|| "text/plain".to_string())
        .to_ascii_lowercase()
}

/// Transfer-decoded, charset-decoded text of a body part.
fn text_payload(part: &MessagePart<'_>) -> String {
    match &part.body {
        PartType::Text(text) | PartType::Html(text) => text.to_string(),
        _ => String::from_utf8_lossy(part.contents()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    fn parse(raw: &str) -> ParsedEmail {
        let msg = MessageParser::default()
            .parse(raw.as_bytes())
            .expect("test message parses");
        parse_parts(&msg)
    }

    #[test]
    fn test_classify_attachment_takes_precedence() {
        let meta = PartMeta {
            filename: Some("report.pdf"),
            disposition: Some("attachment"),
            content_type: "text/plain",
        };
        assert_eq!(classify(&meta), PartKind::Attachment);
    }

    #[test]
    fn test_classify_disposition_without_filename() {
        let meta = PartMeta {
            filename: None,
            disposition: Some("Attachment"),
            content_type: "text/html",
        };
        assert_eq!(classify(&meta), PartKind::Attachment);
    }

    #[test]
    fn test_classify_bodies_and_ignored() {
        let html = PartMeta {
            content_type: "text/html",
            ..Default::default()
        };
        let text = PartMeta {
            content_type: "text/plain",
            disposition: Some("inline"),
            ..Default::default()
        };
        let other = PartMeta {
            content_type: "image/png",
            ..Default::default()
        };
        assert_eq!(classify(&html), PartKind::Html);
        assert_eq!(classify(&text), PartKind::Text);
        assert_eq!(classify(&other), PartKind::Ignored);
    }

    #[test]
    fn test_parsed_email_last_wins() {
        let parsed = ParsedEmail {
            html_parts: vec!["<p>A</p>".into(), "<p>B</p>".into()],
            text_parts: Vec::new(),
            attachments: Vec::new(),
        };
        assert_eq!(parsed.html(), "<p>B</p>");
        assert_eq!(parsed.txt(), "");
    }

    #[test]
    fn test_single_part_plain() {
        let parsed = parse("Subject: Hi\r\nContent-Type: text/plain\r\n\r\nJust text\r\n");
        assert_eq!(parsed.txt().trim(), "Just text");
        assert_eq!(parsed.html(), "");
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_single_part_html() {
        let parsed = parse("Subject: Hi\r\nContent-Type: text/html\r\n\r\n<b>bold</b>\r\n");
        assert_eq!(parsed.html().trim(), "<b>bold</b>");
        assert_eq!(parsed.txt(), "");
    }

    #[test]
    fn test_unrecognized_leaf_is_dropped() {
        let raw = concat!(
            "Subject: Cal\r\n",
            "Content-Type: multipart/mixed; boundary=\"b\"\r\n",
            "\r\n",
            "--b\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "See invite\r\n",
            "--b\r\n",
            "Content-Type: text/calendar\r\n",
            "\r\n",
            "BEGIN:VCALENDAR\r\n",
            "--b--\r\n",
        );
        let parsed = parse(raw);
        assert_eq!(parsed.text_parts.len(), 1);
        assert!(parsed.html_parts.is_empty());
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_nested_multipart_walk() {
        let raw = concat!(
            "Subject: Nested\r\n",
            "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
            "\r\n",
            "--outer\r\n",
            "Content-Type: multipart/alternative; boundary=\"inner\"\r\n",
            "\r\n",
            "--inner\r\n",
            "Content-Type: text/plain\r\n",
            "\r\n",
            "plain\r\n",
            "--inner\r\n",
            "Content-Type: text/html\r\n",
            "\r\n",
            "<p>rich</p>\r\n",
            "--inner--\r\n",
            "--outer\r\n",
            "Content-Type: application/octet-stream\r\n",
            "Content-Disposition: attachment; filename=\"data.bin\"\r\n",
            "Content-Transfer-Encoding: base64\r\n",
            "\r\n",
            "AAECAw==\r\n",
            "--outer--\r\n",
        );
        let parsed = parse(raw);
        assert_eq!(parsed.txt().trim(), "plain");
        assert_eq!(parsed.html().trim(), "<p>rich</p>");
        assert_eq!(parsed.attachments.len(), 1);
        assert_eq!(parsed.attachments[0].name, "data.bin");
        assert_eq!(parsed.attachments[0].content, vec![0u8, 1, 2, 3]);
        assert_eq!(parsed.attachments[0].content_type, "application/octet-stream");
    }
}
