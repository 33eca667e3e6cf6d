//! The session collaborator that issues IMAP commands.
//!
//! This crate never speaks the wire protocol itself. Everything that touches
//! the server goes through [`Transport`], which a caller implements on top of
//! an authenticated IMAP session. The session is stateful: exactly one
//! mailbox is selected at a time and commands are answered in order, so
//! every method takes `&mut self`.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::parser::mutf7;

/// IMAP unique identifier, scoped to a single mailbox.
pub type Uid = u32;

/// Items requested for every materializing fetch.
///
/// `BODY.PEEK[]` leaves `\Seen` untouched.
pub const FETCH_ITEMS: &str = "(BODY.PEEK[] FLAGS X-GM-THRID X-GM-MSGID X-GM-LABELS)";

/// One answer to a `UID FETCH` command.
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// The literal response line with its annotations, e.g.
    /// `1 (X-GM-THRID 1278455344230334865 X-GM-MSGID ... FLAGS (\Seen) BODY[] {2345}`.
    pub header_text: String,
    /// The raw RFC 5322 message bytes.
    pub raw: Vec<u8>,
}

/// Tagged completion status of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    No,
    Bad,
}

/// Answer to a `UID SEARCH` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResponse {
    pub status: Status,
    pub uids: Vec<Uid>,
}

impl SearchResponse {
    /// Successful search with the given UIDs.
    pub fn ok(uids: Vec<Uid>) -> Self {
        Self {
            status: Status::Ok,
            uids,
        }
    }

    /// Failed search (`NO`), carrying no UIDs.
    pub fn no() -> Self {
        Self {
            status: Status::No,
            uids: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

/// Single-token mutation issued with `UID STORE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    AddFlag,
    RemoveFlag,
    AddLabel,
    RemoveLabel,
}

/// Flags defined by RFC 3501 that travel with a leading backslash.
const SYSTEM_FLAGS: &[&str] = &["Seen", "Answered", "Flagged", "Deleted", "Draft", "Recent"];

/// Gmail labels that travel as backslash atoms.
const SYSTEM_LABELS: &[&str] = &[
    "Inbox",
    "AllMail",
    "Draft",
    "Drafts",
    "Important",
    "Sent",
    "Spam",
    "Starred",
    "Trash",
];

impl StoreOp {
    /// The `UID STORE` data item for this operation.
    pub fn item(self) -> &'static str {
        match self {
            StoreOp::AddFlag => "+FLAGS",
            StoreOp::RemoveFlag => "-FLAGS",
            StoreOp::AddLabel => "+X-GM-LABELS",
            StoreOp::RemoveLabel => "-X-GM-LABELS",
        }
    }

    pub fn is_label(self) -> bool {
        matches!(self, StoreOp::AddLabel | StoreOp::RemoveLabel)
    }

    /// Render a plain token (as stored on a [`Message`](crate::model::message::Message))
    /// the way the server expects it in the store command.
    ///
    /// - system flags and labels get their backslash back (`Seen` → `\Seen`)
    /// - other flags (keywords such as `$Forwarded`) are sent as-is
    /// - user labels are quoted, escaped, and modified-UTF-7 encoded
    pub fn wire_token(self, token: &str) -> String {
        if token.starts_with('\\') {
            return token.to_string();
        }
        if self.is_label() {
            if SYSTEM_LABELS.contains(&token) {
                return format!("\\{token}");
            }
            quote_label(&mutf7::encode(token))
        } else if SYSTEM_FLAGS.contains(&token) {
            format!("\\{token}")
        } else {
            token.to_string()
        }
    }
}

/// Wrap a label in an IMAP quoted string, escaping `"` and `\`.
fn quote_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len() + 2);
    out.push('"');
    for ch in label.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Search criteria matching every message of a Gmail thread.
pub fn thread_criteria(thread_id: &str) -> String {
    format!("(X-GM-THRID {thread_id})")
}

/// Blocking access to one authenticated IMAP session.
///
/// Implementations must return `Err` for any command the server rejects,
/// except [`search`](Transport::search), which reports a `NO`/`BAD`
/// completion through [`SearchResponse::status`].
///
/// Store commands receive the plain token; build the wire command from
/// [`StoreOp::item`] and [`StoreOp::wire_token`].
pub trait Transport {
    /// `UID FETCH <uid> <items>` against the selected mailbox.
    fn fetch(&mut self, uid: Uid, items: &str) -> Result<FetchResponse>;

    /// Fetch several UIDs from the selected mailbox.
    ///
    /// The default issues one [`fetch`](Transport::fetch) per UID in order.
    /// Implementations may fan out, but must have every response in hand
    /// before returning, since the caller may select another mailbox next.
    fn fetch_many(&mut self, uids: &[Uid], items: &str) -> Result<Vec<(Uid, FetchResponse)>> {
        uids.iter()
            .map(|&uid| self.fetch(uid, items).map(|resp| (uid, resp)))
            .collect()
    }

    /// `UID STORE <uid> <op.item()> <op.wire_token(token)>`.
    fn store(&mut self, uid: Uid, op: StoreOp, token: &str) -> Result<()>;

    /// `UID COPY <uid> <destination>`, with `source` currently selected.
    fn copy(&mut self, uid: Uid, destination: &str, source: &str) -> Result<()>;

    /// `UID SEARCH <criteria>` against the selected mailbox.
    fn search(&mut self, criteria: &str) -> Result<SearchResponse>;

    /// `SELECT <name>`, making it the active mailbox.
    fn select_mailbox(&mut self, name: &str) -> Result<()>;

    /// Every mailbox/label name the account exposes.
    fn known_labels(&mut self) -> Result<BTreeSet<String>>;
}
