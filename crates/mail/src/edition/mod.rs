//! Edition assembly
//!
//! An edition is one rendering of the publication for one user: today's
//! counts plus the retained history of each selected mailbox.

mod format;
mod sample;

pub use format::{format_day, format_mailbox_name, format_number, pluralize};
pub use sample::{MAX_SAMPLE_DAYS, sample_edition};

use anyhow::Result;
use chrono::NaiveDate;
use log::info;

use crate::gmail::MailSession;
use crate::history::{HistoryPoint, HistoryStore};
use crate::models::{Metric, UserId, UserRecord};
use crate::source::fetch_today_counts;
use crate::storage::UserStore;

/// One mailbox's section of an edition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditionMailbox {
    pub name: String,
    pub metric: Metric,
    /// Today's count
    pub count: u64,
    /// Retained history, oldest first, today included
    pub history: Vec<HistoryPoint>,
}

/// Everything needed to render one edition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    /// Account the counts belong to
    pub email: String,
    pub mailboxes: Vec<EditionMailbox>,
    /// Length of the first mailbox's history; drives the chart width
    pub days_of_data: usize,
}

impl Edition {
    pub fn new(email: impl Into<String>, mailboxes: Vec<EditionMailbox>) -> Self {
        let days_of_data = mailboxes.first().map_or(0, |mb| mb.history.len());
        Self {
            email: email.into(),
            mailboxes,
            days_of_data,
        }
    }
}

/// Fetch today's counts, add them to history and read the history back.
///
/// Nothing is recorded unless every count was fetched.
pub fn build_edition(
    session: &mut MailSession,
    history: &HistoryStore,
    user_id: &UserId,
    user: &UserRecord,
) -> Result<Edition> {
    let counts = fetch_today_counts(session.source.as_mut(), &user.mailboxes)?;

    history.record_daily_counts(user_id, &counts)?;

    let mailboxes = counts
        .into_iter()
        .map(|entry| {
            let points = history.get_history(user_id, &entry.mailbox, entry.metric)?;
            Ok(EditionMailbox {
                name: entry.mailbox,
                metric: entry.metric,
                count: entry.count,
                history: points,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!("[EDITION] Data about {} mailbox(es) for {}", mailboxes.len(), user_id);
    Ok(Edition::new(session.email.clone(), mailboxes))
}

/// Forget a user entirely: their series first, then the record itself
pub fn purge_user(
    users: &UserStore,
    history: &HistoryStore,
    user_id: &UserId,
    user: &UserRecord,
) -> Result<()> {
    for mb in &user.mailboxes {
        history.delete_series(user_id, &mb.name, mb.metric)?;
    }
    users.delete(user_id)?;
    info!("[EDITION] Purged user {}", user_id);
    Ok(())
}

/// Entity tag that changes once a day, so the publisher fetches at most
/// one new edition per day for a given seed (user id, "sample", ...).
pub fn edition_etag(seed: &str, today: NaiveDate) -> String {
    let input = format!("{}{}", seed, today.format("%d%m%Y"));
    blake3::hash(input.as_bytes()).to_hex().to_string()
}
