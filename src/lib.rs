//! `gmail-client`: turns raw IMAP fetch results from Gmail into structured
//! messages.
//!
//! The crate covers message materialization (headers, bodies, attachments,
//! flags, labels, thread ids), flag/label mutation, and reconstruction of
//! conversations spread across a mailbox and the sent folder. The IMAP
//! session itself is supplied by the caller through [`transport::Transport`].

pub mod config;
pub mod error;
pub mod mailbox;
pub mod model;
pub mod parser;
pub mod thread;
pub mod transport;

pub use error::{GmailError, Result};
pub use mailbox::Mailbox;
pub use model::attachment::Attachment;
pub use model::message::Message;
pub use transport::{FetchResponse, SearchResponse, StoreOp, Transport, Uid};
