//! Shared helpers for the integration tests: fixture loading and a
//! recording in-memory [`Transport`].

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use gmail_client::{FetchResponse, GmailError, Result, SearchResponse, StoreOp, Transport, Uid};

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture(name)).unwrap()
}

/// A minimal single-part message.
pub fn raw_message(subject: &str, date: &str) -> Vec<u8> {
    format!(
        "From: a@example.com\r\nTo: b@example.com\r\nSubject: {subject}\r\nDate: {date}\r\n\r\nbody\r\n"
    )
    .into_bytes()
}

pub fn response(annotations: &str, raw: Vec<u8>) -> FetchResponse {
    FetchResponse {
        header_text: annotations.to_string(),
        raw,
    }
}

/// In-memory session. Fetches and searches are answered per selected
/// mailbox; every command is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub selected: String,
    pub mailboxes: HashMap<String, BTreeMap<Uid, FetchResponse>>,
    /// Search answers per mailbox. A mailbox without an entry errors.
    pub searches: HashMap<String, SearchResponse>,
    pub labels: BTreeSet<String>,
    pub fail_store: bool,

    pub stores: Vec<(Uid, StoreOp, String)>,
    pub copies: Vec<(Uid, String, String)>,
    pub selects: Vec<String>,
    pub fetches: Vec<(String, Uid)>,
}

impl MockTransport {
    pub fn new(selected: &str) -> Self {
        Self {
            selected: selected.to_string(),
            ..Default::default()
        }
    }

    pub fn with_message(mut self, mailbox: &str, uid: Uid, response: FetchResponse) -> Self {
        self.mailboxes
            .entry(mailbox.to_string())
            .or_default()
            .insert(uid, response);
        self
    }

    pub fn with_search(mut self, mailbox: &str, response: SearchResponse) -> Self {
        self.searches.insert(mailbox.to_string(), response);
        self
    }
}

impl Transport for MockTransport {
    fn fetch(&mut self, uid: Uid, _items: &str) -> Result<FetchResponse> {
        self.fetches.push((self.selected.clone(), uid));
        self.mailboxes
            .get(&self.selected)
            .and_then(|m| m.get(&uid))
            .cloned()
            .ok_or_else(|| GmailError::remote("FETCH", format!("no UID {uid} in {}", self.selected)))
    }

    fn fetch_many(&mut self, uids: &[Uid], _items: &str) -> Result<Vec<(Uid, FetchResponse)>> {
        let selected = self.selected.clone();
        self.fetches.extend(uids.iter().map(|&uid| (selected.clone(), uid)));
        let Some(messages) = self.mailboxes.get(&selected) else {
            return Ok(Vec::new());
        };
        Ok(uids
            .iter()
            .filter_map(|uid| messages.get(uid).map(|r| (*uid, r.clone())))
            .collect())
    }

    fn store(&mut self, uid: Uid, op: StoreOp, token: &str) -> Result<()> {
        if self.fail_store {
            return Err(GmailError::remote("STORE", "NO [CANNOT] store rejected"));
        }
        self.stores.push((uid, op, token.to_string()));
        Ok(())
    }

    fn copy(&mut self, uid: Uid, destination: &str, source: &str) -> Result<()> {
        self.copies
            .push((uid, destination.to_string(), source.to_string()));
        Ok(())
    }

    fn search(&mut self, _criteria: &str) -> Result<SearchResponse> {
        self.searches
            .get(&self.selected)
            .cloned()
            .ok_or_else(|| GmailError::remote("SEARCH", format!("{} unavailable", self.selected)))
    }

    fn select_mailbox(&mut self, name: &str) -> Result<()> {
        self.selects.push(name.to_string());
        self.selected = name.to_string();
        Ok(())
    }

    fn known_labels(&mut self) -> Result<BTreeSet<String>> {
        Ok(self.labels.clone())
    }
}
