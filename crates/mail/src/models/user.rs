//! User record: the credential and mailbox choices behind one subscription

use serde::{Deserialize, Serialize};
use std::fmt;

use super::MailboxSelection;

/// Opaque identifier handed to the publisher in the return URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// What we keep about a subscriber
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Google OAuth2 refresh token for re-authenticating the user
    pub refresh_token: String,
    /// Mailboxes in the order they appear in the publication
    pub mailboxes: Vec<MailboxSelection>,
}

impl UserRecord {
    pub fn new(refresh_token: impl Into<String>, mailboxes: Vec<MailboxSelection>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            mailboxes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metric;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_user_record_new() {
        let record = UserRecord::new("token", vec![MailboxSelection::new("INBOX", Metric::Total)]);
        assert_eq!(record.refresh_token, "token");
        assert_eq!(record.mailboxes.len(), 1);
    }
}
