//! Domain models for mailbox metrics

mod mailbox;
mod metric;
mod user;

pub use mailbox::{MAX_MAILBOXES, MailboxInfo, MailboxSelection, order_mailboxes};
pub use metric::{Metric, UnknownMetric};
pub use user::{UserId, UserRecord};
