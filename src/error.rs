//! Centralized error types for gmail-client.

use std::path::PathBuf;
use thiserror::Error;

use crate::transport::Uid;

/// All errors produced by the gmail-client library.
///
/// Tolerant parsers (header decoding, annotation extraction, MIME
/// classification) never produce these; only fatal parse failures and
/// remote-call failures do.
#[derive(Error, Debug)]
pub enum GmailError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A command issued through the transport failed.
    #[error("{command} failed: {reason}")]
    Remote {
        command: &'static str,
        reason: String,
    },

    /// The raw bytes of a fetch response could not be parsed as a message.
    #[error("UID {uid}: fetched bytes are not a parseable message")]
    UnparseableMessage { uid: Uid },

    /// The message has no `Date:` header.
    #[error("UID {uid}: message has no Date header")]
    MissingDate { uid: Uid },

    /// The `Date:` header could not be parsed.
    #[error("UID {uid}: unparseable Date header '{value}'")]
    InvalidDate { uid: Uid, value: String },

    /// Thread reconstruction needs an `X-GM-THRID` annotation.
    #[error("UID {uid}: message has no thread identifier")]
    MissingThreadId { uid: Uid },

    /// A message was paired with a mailbox cache it does not belong to.
    #[error("message belongs to '{found}', not '{expected}'")]
    MailboxMismatch { expected: String, found: String },

    /// No trash mailbox name is configured.
    #[error("no trash mailbox configured")]
    NoTrashMailbox,

    /// An invalid path was provided.
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Convenience alias for `Result<T, GmailError>`.
pub type Result<T> = std::result::Result<T, GmailError>;

impl GmailError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Remote` variant for a failed transport command.
    pub fn remote(command: &'static str, reason: impl Into<String>) -> Self {
        Self::Remote {
            command,
            reason: reason.into(),
        }
    }
}

/// Allow `?` on `std::io::Error` when no path context is available
/// (rare, prefer `GmailError::io`).
impl From<std::io::Error> for GmailError {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::from("<unknown>"),
            source,
        }
    }
}
