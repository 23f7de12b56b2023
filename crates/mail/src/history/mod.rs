//! Mailbox metrics history
//!
//! Daily counts per (user, mailbox, metric), kept for a rolling window
//! and read back oldest first for charting:
//! - `key`: series keys and `YYYYMMDD` date fields
//! - `store`: recording with eviction, history reads, deletion
//! - `clock`: where "today" comes from

mod clock;
mod key;
mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use key::{day_field, series_key};
pub use store::{DailyCount, HistoryPoint, HistoryStore, retention_cutoff};

/// Number of trailing days (today included) a series keeps
pub const RETENTION_DAYS: u64 = 30;
