//! Mail crate - Business logic for the mailbox almanac
//!
//! This crate provides:
//! - Domain models (Metric, MailboxSelection, UserRecord)
//! - Gmail OAuth and IMAP access behind the `MailProvider` seam
//! - Hash storage abstraction with in-memory and SQLite backends
//! - Retention-bounded daily history per mailbox and metric
//! - Edition assembly and formatting
//!
//! Everything here is synchronous and free of HTTP server concerns; the
//! `almanac` binary wires it to the web.

pub mod config;
pub mod edition;
pub mod gmail;
pub mod history;
pub mod models;
pub mod source;
pub mod storage;

pub use config::GmailCredentials;
pub use edition::{
    Edition, EditionMailbox, build_edition, edition_etag, format_day, format_mailbox_name,
    format_number, pluralize, purge_user, sample_edition,
};
pub use gmail::{AuthError, GmailAuth, GmailProvider, Grant, MailProvider, MailSession};
pub use history::{Clock, DailyCount, FixedClock, HistoryPoint, HistoryStore, RETENTION_DAYS, SystemClock};
pub use models::{MAX_MAILBOXES, MailboxInfo, MailboxSelection, Metric, UserId, UserRecord};
pub use source::{MailSource, fetch_today_counts};
pub use storage::{HashTxn, InMemoryKvStore, KvStore, Namespace, SqliteKvStore, UserStore};
