//! Turns one fetch response into the fields of a [`Message`](crate::model::message::Message).

use chrono::{DateTime, Local};
use mail_parser::MessageParser;

use super::header::{decode_header_text, get_header, parse_date, parse_header_block};
use super::metadata::{extract_metadata, Metadata};
use super::mime::{parse_parts, ParsedEmail};
use crate::error::{GmailError, Result};
use crate::transport::Uid;

/// Everything a fetch response yields, fully decoded.
#[derive(Debug, Clone)]
pub struct Materialized {
    /// Unfolded headers, names lowercased, values as on the wire.
    pub headers: Vec<(String, String)>,
    pub subject: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub delivered_to: Option<String>,
    pub sent_at: DateTime<Local>,
    pub parts: ParsedEmail,
    pub metadata: Metadata,
}

/// Materialize one fetch response.
///
/// `header_text` is the annotation line of the response and `raw` the
/// message bytes. Only a missing or unparseable `Date:` header (or bytes
/// that are not a message at all) fail; everything else degrades to empty
/// values.
pub fn materialize(uid: Uid, header_text: &str, raw: &[u8]) -> Result<Materialized> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or(GmailError::UnparseableMessage { uid })?;

    let headers = parse_header_block(raw);

    let date_raw = get_header(&headers, "date").ok_or(GmailError::MissingDate { uid })?;
    let sent_at = parse_date(date_raw)
        .ok_or_else(|| GmailError::InvalidDate {
            uid,
            value: date_raw.to_string(),
        })?
        .with_timezone(&Local);

    let decoded = |name: &str| get_header(&headers, name).map(decode_header_text);

    let subject = decoded("subject").unwrap_or_default();
    let from = decoded("from");
    let to = decoded("to");
    let cc = decoded("cc");
    let delivered_to = decoded("delivered-to");

    let parts = parse_parts(&parsed);
    let metadata = extract_metadata(header_text);

    tracing::debug!(
        uid,
        subject = %subject,
        attachments = parts.attachments.len(),
        thread_id = metadata.thread_id.as_deref().unwrap_or("-"),
        "Materialized message"
    );

    Ok(Materialized {
        headers,
        subject,
        from,
        to,
        cc,
        delivered_to,
        sent_at,
        parts,
        metadata,
    })
}
