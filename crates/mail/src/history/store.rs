//! Retention-bounded daily count storage

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use log::{debug, warn};
use std::sync::Arc;

use super::key::{day_field, parse_day_field, series_key};
use super::{Clock, RETENTION_DAYS};
use crate::models::{Metric, UserId};
use crate::storage::{HashTxn, Namespace};

/// One day's count in a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryPoint {
    pub day: NaiveDate,
    pub count: u64,
}

impl HistoryPoint {
    pub fn new(day: NaiveDate, count: u64) -> Self {
        Self { day, count }
    }
}

/// A count to record for one mailbox/metric pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCount {
    pub mailbox: String,
    pub metric: Metric,
    pub count: u64,
}

impl DailyCount {
    pub fn new(mailbox: impl Into<String>, metric: Metric, count: u64) -> Self {
        Self {
            mailbox: mailbox.into(),
            metric,
            count,
        }
    }
}

/// Oldest day that survives eviction when writing on `today`
///
/// Keeps exactly `RETENTION_DAYS` days, today included.
pub fn retention_cutoff(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(RETENTION_DAYS - 1))
        .unwrap_or(NaiveDate::MIN)
}

/// Remove every date field older than `cutoff` from one series
fn evict_before(txn: &mut dyn HashTxn, cutoff: NaiveDate) -> Result<usize> {
    let cutoff = day_field(cutoff);

    // Fields come back ascending and YYYYMMDD sorts by date, so the
    // first field at or past the cutoff ends the walk.
    let mut expired = Vec::new();
    for field in txn.fields()? {
        if field.as_str() < cutoff.as_str() {
            expired.push(field);
        } else {
            break;
        }
    }

    if expired.is_empty() {
        return Ok(0);
    }
    txn.remove(&expired)
}

/// Per-user, per-mailbox, per-metric daily counts
///
/// Each series is a hash of `YYYYMMDD -> count` stored under
/// [`series_key`]. Writing a count also evicts that series' entries
/// older than the retention window, in the same store transaction.
pub struct HistoryStore {
    ns: Namespace,
    clock: Arc<dyn Clock>,
}

impl HistoryStore {
    pub fn new(ns: Namespace, clock: Arc<dyn Clock>) -> Self {
        Self { ns, clock }
    }

    /// Today according to the store's clock
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Record today's count for a series, replacing any earlier count
    /// from today, then drop entries that fell out of the window.
    pub fn record_daily_count(
        &self,
        user_id: &UserId,
        mailbox_name: &str,
        metric: Metric,
        count: u64,
    ) -> Result<()> {
        if mailbox_name.is_empty() {
            anyhow::bail!("Cannot record a count for an empty mailbox name");
        }

        let today = self.clock.today();
        let key = self.ns.key(&series_key(user_id, mailbox_name, metric));
        let field = day_field(today);
        let value = count.to_string();
        let cutoff = retention_cutoff(today);

        let mut evicted = 0;
        self.ns
            .store()
            .transact(&key, &mut |txn| {
                txn.set(&field, &value)?;
                evicted = evict_before(txn, cutoff)?;
                Ok(())
            })
            .with_context(|| {
                format!(
                    "Failed to record {} count for {} / {}",
                    metric, user_id, mailbox_name
                )
            })?;

        debug!(
            "[HISTORY] {} {} {} = {} on {} (evicted {})",
            user_id, mailbox_name, metric, count, field, evicted
        );
        Ok(())
    }

    /// Record several counts for one user.
    ///
    /// Each count is written on its own; a failure doesn't undo the
    /// others. Every element is attempted and the first error, if any,
    /// is returned.
    pub fn record_daily_counts(&self, user_id: &UserId, counts: &[DailyCount]) -> Result<()> {
        let mut first_error = None;

        for entry in counts {
            if let Err(e) = self.record_daily_count(user_id, &entry.mailbox, entry.metric, entry.count)
            {
                warn!("[HISTORY] {:#}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Every retained entry of a series, oldest first.
    ///
    /// Missing days are simply absent. A series that was never written
    /// is empty rather than an error.
    pub fn get_history(
        &self,
        user_id: &UserId,
        mailbox_name: &str,
        metric: Metric,
    ) -> Result<Vec<HistoryPoint>> {
        let key = self.ns.key(&series_key(user_id, mailbox_name, metric));
        let entries = self.ns.store().hgetall(&key)?;

        let mut points: Vec<HistoryPoint> = entries
            .into_iter()
            .filter_map(|(field, value)| {
                let day = parse_day_field(&field);
                let count = value.trim().parse::<u64>().ok();
                match (day, count) {
                    (Some(day), Some(count)) => Some(HistoryPoint::new(day, count)),
                    _ => {
                        warn!("[HISTORY] Skipping malformed entry {}={} in {}", field, value, key);
                        None
                    }
                }
            })
            .collect();

        // Backends already return fields in order; sorting by date keeps
        // the ascending contract independent of that.
        points.sort_by_key(|p| p.day);
        Ok(points)
    }

    /// Delete a whole series; a missing series is not an error
    pub fn delete_series(&self, user_id: &UserId, mailbox_name: &str, metric: Metric) -> Result<()> {
        let key = self.ns.key(&series_key(user_id, mailbox_name, metric));
        self.ns.store().del(&key)?;
        Ok(())
    }
}
