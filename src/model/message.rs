//! The materialized message and its remote mutations.
//!
//! A [`Message`] starts out unfetched, knowing only its mailbox and UID. The
//! first [`fetch`](Message::fetch) (or any [`forced_fetch`](Message::forced_fetch))
//! pulls body, flags and Gmail annotations through a [`Transport`] and
//! populates every field. Flag and label mutations are sent to the server
//! first and mirrored locally only once the server has accepted them.

use std::collections::BTreeSet;

use chrono::{DateTime, Local};
use tracing::debug;

use super::address::EmailAddress;
use super::attachment::Attachment;
use crate::config::MailboxNames;
use crate::error::{GmailError, Result};
use crate::parser::header::{decode_header_text, get_header};
use crate::parser::message::{materialize, Materialized};
use crate::transport::{FetchResponse, StoreOp, Transport, Uid, FETCH_ITEMS};

pub const SEEN: &str = "Seen";
pub const FLAGGED: &str = "Flagged";
pub const DRAFT: &str = "Draft";
pub const DELETED: &str = "Deleted";

/// One message of one mailbox.
#[derive(Debug, Clone)]
pub struct Message {
    /// UID, unique within `mailbox` only.
    pub uid: Uid,
    /// Name of the mailbox this message was listed in.
    pub mailbox: String,

    /// Decoded `Subject:`.
    pub subject: String,
    /// Plain-text body (empty if the message has none).
    pub body: String,
    /// HTML body (empty if the message has none).
    pub html: String,

    /// Decoded `From:`.
    pub from: Option<String>,
    /// Decoded `To:`.
    pub to: Option<String>,
    /// Decoded `Cc:`.
    pub cc: Option<String>,
    /// Decoded `Delivered-To:`.
    pub delivered_to: Option<String>,

    /// `Date:` header in local time. `None` until fetched.
    pub sent_at: Option<DateTime<Local>>,

    /// Gmail thread id (`X-GM-THRID`).
    pub thread_id: Option<String>,
    /// Gmail message id (`X-GM-MSGID`).
    pub message_id: Option<String>,

    pub attachments: Vec<Attachment>,

    headers: Vec<(String, String)>,
    flags: BTreeSet<String>,
    labels: BTreeSet<String>,
    fetched: bool,
}

impl Message {
    /// An unfetched message.
    pub fn new(mailbox: impl Into<String>, uid: Uid) -> Self {
        Self {
            uid,
            mailbox: mailbox.into(),
            subject: String::new(),
            body: String::new(),
            html: String::new(),
            from: None,
            to: None,
            cc: None,
            delivered_to: None,
            sent_at: None,
            thread_id: None,
            message_id: None,
            attachments: Vec::new(),
            headers: Vec::new(),
            flags: BTreeSet::new(),
            labels: BTreeSet::new(),
            fetched: false,
        }
    }

    /// Build a fetched message straight from a fetch response.
    pub fn from_response(
        mailbox: impl Into<String>,
        uid: Uid,
        response: &FetchResponse,
    ) -> Result<Self> {
        let mut message = Self::new(mailbox, uid);
        message.populate(response)?;
        Ok(message)
    }

    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    /// Fetch the message unless that already happened.
    pub fn fetch<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<&Self> {
        if !self.fetched {
            self.forced_fetch(transport)?;
        }
        Ok(self)
    }

    /// Fetch and re-parse the message regardless of its current state.
    pub fn forced_fetch<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<&Self> {
        let response = transport.fetch(self.uid, FETCH_ITEMS)?;
        self.populate(&response)?;
        Ok(self)
    }

    /// Replace every fetched field with the contents of `response`.
    ///
    /// On error the message is left untouched.
    pub fn populate(&mut self, response: &FetchResponse) -> Result<()> {
        let Materialized {
            headers,
            subject,
            from,
            to,
            cc,
            delivered_to,
            sent_at,
            parts,
            metadata,
        } = materialize(self.uid, &response.header_text, &response.raw)?;

        self.body = parts.txt().to_string();
        self.html = parts.html().to_string();
        self.attachments = parts.attachments;
        self.headers = headers;
        self.subject = subject;
        self.from = from;
        self.to = to;
        self.cc = cc;
        self.delivered_to = delivered_to;
        self.sent_at = Some(sent_at);
        self.flags = metadata.flags;
        self.labels = metadata.labels;
        self.thread_id = metadata.thread_id;
        self.message_id = metadata.message_id;
        self.fetched = true;
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────

    /// Unfolded headers, names lowercased.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First raw value of a header (case-insensitive name).
    pub fn header(&self, name: &str) -> Option<&str> {
        get_header(&self.headers, name)
    }

    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Parsed `From:` address.
    ///
    /// Addresses are split on the raw header value and only then have their
    /// display names decoded, so an encoded `,` cannot split an entry.
    pub fn sender(&self) -> Option<EmailAddress> {
        self.header("from")
            .map(EmailAddress::parse)
            .map(decode_display_name)
    }

    /// Parsed `To:` and `Cc:` addresses.
    pub fn recipients(&self) -> Vec<EmailAddress> {
        [self.header("to"), self.header("cc")]
            .into_iter()
            .flatten()
            .flat_map(EmailAddress::parse_list)
            .map(decode_display_name)
            .collect()
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn is_read(&self) -> bool {
        self.has_flag(SEEN)
    }

    pub fn is_starred(&self) -> bool {
        self.has_flag(FLAGGED)
    }

    pub fn is_draft(&self) -> bool {
        self.has_flag(DRAFT)
    }

    pub fn is_deleted(&self) -> bool {
        self.has_flag(DELETED)
    }

    // ── Flag and label mutations ────────────────────────────────

    /// Add a flag (without backslash, e.g. `"Seen"`). No-op if already set.
    pub fn add_flag<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        flag: &str,
    ) -> Result<&mut Self> {
        if !self.flags.contains(flag) {
            self.store(transport, StoreOp::AddFlag, flag)?;
            self.flags.insert(flag.to_string());
        }
        Ok(self)
    }

    /// Remove a flag. No-op if not set.
    pub fn remove_flag<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        flag: &str,
    ) -> Result<&mut Self> {
        if self.flags.contains(flag) {
            self.store(transport, StoreOp::RemoveFlag, flag)?;
            self.flags.remove(flag);
        }
        Ok(self)
    }

    /// Add a Gmail label. No-op if already present.
    pub fn add_label<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        label: &str,
    ) -> Result<&mut Self> {
        if !self.labels.contains(label) {
            self.store(transport, StoreOp::AddLabel, label)?;
            self.labels.insert(label.to_string());
        }
        Ok(self)
    }

    /// Remove a Gmail label. No-op if absent.
    pub fn remove_label<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        label: &str,
    ) -> Result<&mut Self> {
        if self.labels.contains(label) {
            self.store(transport, StoreOp::RemoveLabel, label)?;
            self.labels.remove(label);
        }
        Ok(self)
    }

    fn store<T: Transport + ?Sized>(&self, transport: &mut T, op: StoreOp, token: &str) -> Result<()> {
        debug!(uid = self.uid, mailbox = %self.mailbox, item = op.item(), token, "STORE");
        transport.store(self.uid, op, token)
    }

    pub fn mark_read<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<&mut Self> {
        self.add_flag(transport, SEEN)
    }

    pub fn mark_unread<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<&mut Self> {
        self.remove_flag(transport, SEEN)
    }

    pub fn star<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<&mut Self> {
        self.add_flag(transport, FLAGGED)
    }

    pub fn un_star<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<&mut Self> {
        self.remove_flag(transport, FLAGGED)
    }

    // ── Moves ───────────────────────────────────────────────────

    /// Copy the message to `destination` and, unless that is a trash
    /// mailbox, flag it `Deleted` here.
    pub fn move_to<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        names: &MailboxNames,
        destination: &str,
    ) -> Result<&mut Self> {
        debug!(uid = self.uid, from = %self.mailbox, to = destination, "COPY");
        transport.copy(self.uid, destination, &self.mailbox)?;
        if !names.is_trash(destination) {
            self.add_flag(transport, DELETED)?;
        }
        Ok(self)
    }

    /// Move the message to the account's trash (unless it is already there)
    /// and flag it `Deleted`.
    pub fn delete<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        names: &MailboxNames,
    ) -> Result<&mut Self> {
        if !names.is_trash(&self.mailbox) {
            let known = transport.known_labels()?;
            let trash = names
                .resolve_trash(&known)
                .ok_or(GmailError::NoTrashMailbox)?
                .to_string();
            self.move_to(transport, names, &trash)?;
        }
        self.add_flag(transport, DELETED)
    }

    /// Move the message to All Mail.
    pub fn archive<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        names: &MailboxNames,
    ) -> Result<&mut Self> {
        self.move_to(transport, names, &names.all_mail)
    }
}

fn decode_display_name(mut address: EmailAddress) -> EmailAddress {
    address.display_name = decode_header_text(&address.display_name);
    address
}
