//! Mailbox models: what the server offers and what the user picked

use serde::{Deserialize, Serialize};

use super::Metric;

/// Maximum number of mailboxes a user can put in one publication
pub const MAX_MAILBOXES: usize = 4;

/// A mailbox/label as listed by the IMAP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxInfo {
    /// Full mailbox name, e.g. "INBOX" or "[Gmail]/Sent Mail"
    pub name: String,
    /// False for \Noselect containers which can't be counted
    pub selectable: bool,
}

impl MailboxInfo {
    pub fn new(name: impl Into<String>, selectable: bool) -> Self {
        Self {
            name: name.into(),
            selectable,
        }
    }

    // Well-known Gmail mailboxes
    pub const INBOX: &'static str = "INBOX";
    pub const STARRED: &'static str = "[Gmail]/Starred";
    pub const IMPORTANT: &'static str = "[Gmail]/Important";
    pub const SENT: &'static str = "[Gmail]/Sent Mail";
    pub const DRAFTS: &'static str = "[Gmail]/Drafts";
    pub const ALL_MAIL: &'static str = "[Gmail]/All Mail";
    pub const SPAM: &'static str = "[Gmail]/Spam";
    pub const BIN: &'static str = "[Gmail]/Bin";
}

/// One mailbox/metric pair chosen by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxSelection {
    pub name: String,
    pub metric: Metric,
}

impl MailboxSelection {
    pub fn new(name: impl Into<String>, metric: Metric) -> Self {
        Self {
            name: name.into(),
            metric,
        }
    }
}

/// Position of a mailbox in Gmail's own sidebar order
fn mailbox_sort_order(name: &str) -> u32 {
    match name {
        MailboxInfo::INBOX => 0,
        MailboxInfo::STARRED => 1,
        MailboxInfo::IMPORTANT => 2,
        MailboxInfo::SENT => 3,
        MailboxInfo::DRAFTS => 4,
        MailboxInfo::ALL_MAIL => 5,
        MailboxInfo::SPAM => 6,
        MailboxInfo::BIN => 7,
        _ => 100, // Everything else keeps server order after these
    }
}

/// Put mailboxes in the order Gmail shows them.
///
/// The well-known system mailboxes move to the front; the rest keep the
/// order the server listed them in (the sort is stable).
pub fn order_mailboxes(mut mailboxes: Vec<MailboxInfo>) -> Vec<MailboxInfo> {
    mailboxes.sort_by_key(|m| mailbox_sort_order(&m.name));
    mailboxes
}
