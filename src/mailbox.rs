//! Per-mailbox message cache.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::model::message::Message;
use crate::thread;
use crate::transport::{Transport, Uid, FETCH_ITEMS};

/// The messages seen so far in one mailbox, keyed by UID.
///
/// Entries live until the cache is cleared or replaced.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    pub name: String,
    pub messages: BTreeMap<Uid, Message>,
}

impl Mailbox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: BTreeMap::new(),
        }
    }

    /// The cached message for `uid`, inserting an unfetched one if needed.
    pub fn message(&mut self, uid: Uid) -> &mut Message {
        let name = &self.name;
        self.messages
            .entry(uid)
            .or_insert_with(|| Message::new(name.clone(), uid))
    }

    /// Insert or overwrite cached messages.
    pub fn merge(&mut self, messages: impl IntoIterator<Item = (Uid, Message)>) {
        self.messages.extend(messages);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Reconstruct the thread of the cached message `uid`.
    ///
    /// See [`thread::fetch_thread`]. `sent` is the cache of the account's
    /// sent mailbox.
    pub fn fetch_thread<T: Transport + ?Sized>(
        &mut self,
        uid: Uid,
        transport: &mut T,
        sent: &mut Mailbox,
    ) -> Result<Vec<Message>> {
        let mut origin = self
            .messages
            .remove(&uid)
            .unwrap_or_else(|| Message::new(self.name.clone(), uid));

        let result = thread::fetch_thread(transport, &mut origin, self, sent);

        // The thread fetch re-caches the origin under its UID; otherwise put ours back.
        self.messages.entry(uid).or_insert(origin);
        result
    }
}

/// Materialize every message of `messages` from the selected mailbox.
///
/// UIDs the server did not answer for stay unfetched.
pub fn fetch_all<T: Transport + ?Sized>(
    transport: &mut T,
    messages: &mut BTreeMap<Uid, Message>,
) -> Result<()> {
    if messages.is_empty() {
        return Ok(());
    }

    let uids: Vec<Uid> = messages.keys().copied().collect();
    let responses = transport.fetch_many(&uids, FETCH_ITEMS)?;
    debug!(requested = uids.len(), received = responses.len(), "Batch fetch");

    for (uid, response) in responses {
        if let Some(message) = messages.get_mut(&uid) {
            message.populate(&response)?;
        }
    }
    Ok(())
}
