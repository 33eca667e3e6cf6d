//! Gmail conversation reconstruction.
//!
//! Gmail tags every message of a conversation with the same `X-GM-THRID`,
//! but a conversation is spread over the mailbox it was received in and
//! the sent mailbox. Both are searched, materialized, cached, and merged
//! into one chronologically ordered list.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::error::{GmailError, Result};
use crate::mailbox::{fetch_all, Mailbox};
use crate::model::message::Message;
use crate::transport::{thread_criteria, Transport, Uid};

/// Fetch every message sharing `origin`'s thread id from `home` (the
/// mailbox `origin` lives in) and `sent`, oldest first.
///
/// Both caches are updated with what was fetched. The session is left with
/// `home` selected. A failed search in either mailbox contributes nothing
/// from that mailbox instead of aborting; any other failure propagates.
pub fn fetch_thread<T: Transport + ?Sized>(
    transport: &mut T,
    origin: &mut Message,
    home: &mut Mailbox,
    sent: &mut Mailbox,
) -> Result<Vec<Message>> {
    if origin.mailbox != home.name {
        return Err(GmailError::MailboxMismatch {
            expected: home.name.clone(),
            found: origin.mailbox.clone(),
        });
    }

    transport.select_mailbox(&home.name)?;
    origin.fetch(transport)?;
    let thread_id = origin
        .thread_id
        .clone()
        .ok_or(GmailError::MissingThreadId { uid: origin.uid })?;
    let criteria = thread_criteria(&thread_id);

    let received = collect_mailbox(transport, &criteria, home)?;

    transport.select_mailbox(&sent.name)?;
    let sent_half = collect_mailbox(transport, &criteria, sent);
    // Restore before reporting a failure from the sent half.
    transport.select_mailbox(&home.name)?;
    let sent_messages = sent_half?;

    info!(
        thread_id = %thread_id,
        received = received.len(),
        sent = sent_messages.len(),
        "Reconstructed thread"
    );
    Ok(merge_thread(received, sent_messages))
}

/// Combine the two per-mailbox results, oldest first.
///
/// UIDs are only unique per mailbox; on a collision the `sent` entry wins.
pub fn merge_thread(
    received: BTreeMap<Uid, Message>,
    sent: BTreeMap<Uid, Message>,
) -> Vec<Message> {
    let mut merged = received;
    merged.extend(sent);

    let mut messages: Vec<Message> = merged.into_values().collect();
    messages.sort_by_key(|m| m.sent_at);
    messages
}

/// Search the selected mailbox, materialize the hits, and cache them.
fn collect_mailbox<T: Transport + ?Sized>(
    transport: &mut T,
    criteria: &str,
    mailbox: &mut Mailbox,
) -> Result<BTreeMap<Uid, Message>> {
    let uids = match transport.search(criteria) {
        Ok(response) if response.is_ok() => response.uids,
        Ok(response) => {
            warn!(mailbox = %mailbox.name, status = ?response.status, "Thread search failed");
            return Ok(BTreeMap::new());
        }
        Err(e) => {
            warn!(mailbox = %mailbox.name, error = %e, "Thread search failed");
            return Ok(BTreeMap::new());
        }
    };

    let mut messages: BTreeMap<Uid, Message> = uids
        .into_iter()
        .map(|uid| (uid, Message::new(mailbox.name.clone(), uid)))
        .collect();
    fetch_all(transport, &mut messages)?;

    mailbox.merge(messages.clone());
    messages.retain(|_, m| m.is_fetched());
    Ok(messages)
}
