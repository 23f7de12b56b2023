//! Calendar source for the history store

use chrono::{Days, Local, NaiveDate};
use std::sync::Mutex;

/// Supplies "today" as a calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The local calendar date of the running process
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock that only moves when told to
///
/// Lets tests write a count "on" any day.
#[derive(Debug)]
pub struct FixedClock {
    today: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set(&self, day: NaiveDate) {
        if let Ok(mut today) = self.today.lock() {
            *today = day;
        }
    }

    /// Move forward by whole days
    pub fn advance(&self, days: u64) {
        if let Ok(mut today) = self.today.lock() {
            if let Some(next) = today.checked_add_days(Days::new(days)) {
                *today = next;
            }
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        match self.today.lock() {
            Ok(today) => *today,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}
