//! Series addressing and date fields

use chrono::NaiveDate;

use crate::models::{Metric, UserId};

/// Date format of hash fields; sorts chronologically as text
const DAY_FORMAT: &str = "%Y%m%d";

/// Build the storage key for one (user, mailbox, metric) series.
///
/// Variable-length parts are length-prefixed (`{bytes}:{text}`), so two
/// different tuples can never produce the same key whatever characters
/// the mailbox name contains.
pub fn series_key(user_id: &UserId, mailbox_name: &str, metric: Metric) -> String {
    format!(
        "{}:{}{}:{}{}",
        user_id.as_str().len(),
        user_id.as_str(),
        mailbox_name.len(),
        mailbox_name,
        metric.as_str()
    )
}

/// Render a day as a `YYYYMMDD` field name
pub fn day_field(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parse a `YYYYMMDD` field name
pub fn parse_day_field(field: &str) -> Option<NaiveDate> {
    if field.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(field, DAY_FORMAT).ok()
}
