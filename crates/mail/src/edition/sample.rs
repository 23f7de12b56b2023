//! Canned edition for previews

use chrono::{Days, NaiveDate};

use super::{Edition, EditionMailbox};
use crate::history::{HistoryPoint, RETENTION_DAYS};
use crate::models::{MailboxInfo, Metric};

/// Most days of history a sample can show
pub const MAX_SAMPLE_DAYS: usize = RETENTION_DAYS as usize;

const SAMPLE_EMAIL: &str = "alex.t.andover@gmail.com";

/// (mailbox, metric, starting count, daily step pattern)
const SAMPLE_SERIES: [(&str, Metric, u64, [i64; 5]); 4] = [
    (MailboxInfo::INBOX, Metric::Total, 1184, [6, -2, 9, 3, -4]),
    (MailboxInfo::INBOX, Metric::Unread, 37, [2, -3, 1, 4, -2]),
    (MailboxInfo::STARRED, Metric::Flagged, 12, [0, 1, 0, -1, 1]),
    ("Work/Projects/Almanac", Metric::Daily, 18, [5, -7, 3, 8, -6]),
];

/// A deterministic edition with `days` days of history ending `today`.
///
/// `days` is clamped to `1..=MAX_SAMPLE_DAYS`; each mailbox's count is
/// the last value of its history.
pub fn sample_edition(today: NaiveDate, days: usize) -> Edition {
    let days = days.clamp(1, MAX_SAMPLE_DAYS);

    let mailboxes = SAMPLE_SERIES
        .iter()
        .map(|(name, metric, start, steps)| {
            let history = sample_history(today, days, *start, steps);
            let count = history.last().map_or(*start, |p| p.count);
            EditionMailbox {
                name: name.to_string(),
                metric: *metric,
                count,
                history,
            }
        })
        .collect();

    Edition::new(SAMPLE_EMAIL, mailboxes)
}

fn sample_history(today: NaiveDate, days: usize, start: u64, steps: &[i64]) -> Vec<HistoryPoint> {
    let first = today
        .checked_sub_days(Days::new(days as u64 - 1))
        .unwrap_or(today);

    let mut count = start;
    first
        .iter_days()
        .take(days)
        .enumerate()
        .map(|(i, day)| {
            if i > 0 {
                count = count.saturating_add_signed(steps[i % steps.len()]);
            }
            HistoryPoint::new(day, count)
        })
        .collect()
}
