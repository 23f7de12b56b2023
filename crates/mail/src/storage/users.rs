//! User record storage

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use super::Namespace;
use crate::models::{MAX_MAILBOXES, MailboxSelection, UserId, UserRecord};

/// Hash holding every user, keyed by user id
const USER_HASH: &str = "user";

/// Current on-disk schema version for user records
const USER_SCHEMA_VERSION: u32 = 1;

/// Stored form of a user record
///
/// Kept separate from [`UserRecord`] so the persisted layout only changes
/// deliberately, with a version bump.
#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    version: u32,
    refresh_token: String,
    mailboxes: Vec<MailboxSelection>,
}

/// Maps user ids to their credential and mailbox selection
pub struct UserStore {
    ns: Namespace,
}

impl UserStore {
    pub fn new(ns: Namespace) -> Self {
        Self { ns }
    }

    /// Persist a new user and return their freshly generated id
    pub fn create(&self, refresh_token: &str, mailboxes: Vec<MailboxSelection>) -> Result<UserId> {
        if mailboxes.is_empty() || mailboxes.len() > MAX_MAILBOXES {
            anyhow::bail!(
                "A user needs between 1 and {} mailboxes, got {}",
                MAX_MAILBOXES,
                mailboxes.len()
            );
        }

        let id = UserId::generate();
        let stored = StoredUser {
            version: USER_SCHEMA_VERSION,
            refresh_token: refresh_token.to_string(),
            mailboxes,
        };
        let data = serde_json::to_string(&stored)?;

        self.ns
            .store()
            .hset(&self.ns.key(USER_HASH), id.as_str(), &data)
            .with_context(|| format!("Failed to store user {}", id))?;

        debug!("[USERS] Created user {} with {} mailbox(es)", id, stored.mailboxes.len());
        Ok(id)
    }

    /// Look up a user, `None` if the id is unknown
    pub fn get(&self, id: &UserId) -> Result<Option<UserRecord>> {
        let Some(data) = self.ns.store().hget(&self.ns.key(USER_HASH), id.as_str())? else {
            return Ok(None);
        };

        let stored: StoredUser = serde_json::from_str(&data)
            .with_context(|| format!("Corrupt user record for {}", id))?;

        if stored.version != USER_SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported user record version {} for {}",
                stored.version,
                id
            );
        }

        Ok(Some(UserRecord {
            refresh_token: stored.refresh_token,
            mailboxes: stored.mailboxes,
        }))
    }

    /// Delete a user; deleting an unknown id is not an error
    pub fn delete(&self, id: &UserId) -> Result<()> {
        self.ns
            .store()
            .hdel(&self.ns.key(USER_HASH), &[id.as_str().to_string()])?;
        Ok(())
    }
}
