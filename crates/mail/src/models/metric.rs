//! Metric model: the counting rule applied to a mailbox

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How messages in a mailbox are counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Every message in the mailbox
    Total,
    /// Messages without the \Seen flag
    Unread,
    /// Messages with the \Flagged flag (Gmail "starred")
    Flagged,
    /// Messages received in the last 24 hours
    Daily,
}

impl Metric {
    /// All metrics, in the order offered on the configuration form
    pub const ALL: [Metric; 4] = [Metric::Total, Metric::Unread, Metric::Flagged, Metric::Daily];

    /// The stable identifier used in forms and storage keys
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Total => "total",
            Metric::Unread => "unread",
            Metric::Flagged => "flagged",
            Metric::Daily => "daily",
        }
    }

    /// Label shown next to the metric on the configuration form
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Total => "Total",
            Metric::Unread => "Unread",
            Metric::Flagged => "Starred",
            Metric::Daily => "Last 24 hours",
        }
    }

    /// Phrase used after the count in the publication ("12 messages starred")
    pub fn publication_phrase(&self) -> &'static str {
        match self {
            Metric::Total => "total",
            Metric::Unread => "unread",
            Metric::Flagged => "starred",
            Metric::Daily => "from past 24 hrs",
        }
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::ALL[0]
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for metric strings outside the closed set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "total" => Ok(Metric::Total),
            "unread" => Ok(Metric::Unread),
            "flagged" => Ok(Metric::Flagged),
            "daily" => Ok(Metric::Daily),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}
