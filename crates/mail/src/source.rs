//! Mail data source abstraction
//!
//! Whatever can list mailboxes and count messages in them. The IMAP
//! implementation lives in `gmail`; tests use fakes.

use anyhow::{Context, Result};

use crate::history::DailyCount;
use crate::models::{MailboxInfo, MailboxSelection, Metric};

/// A logged-in view of one user's mail
pub trait MailSource {
    /// Mailboxes in display order
    fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>>;

    /// Today's count for one mailbox under one metric
    fn count(&mut self, mailbox: &str, metric: Metric) -> Result<u64>;

    /// End the session
    fn logout(&mut self) -> Result<()>;
}

/// Count every selected mailbox.
///
/// All-or-nothing: the first failure is returned and no partial list
/// escapes, so callers never record a half-fetched edition.
pub fn fetch_today_counts(
    source: &mut dyn MailSource,
    selection: &[MailboxSelection],
) -> Result<Vec<DailyCount>> {
    selection
        .iter()
        .map(|mb| {
            let count = source
                .count(&mb.name, mb.metric)
                .with_context(|| format!("Failed to count {} in {}", mb.metric, mb.name))?;
            Ok(DailyCount::new(mb.name.clone(), mb.metric, count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticSource;

    impl MailSource for StaticSource {
        fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
            Ok(vec![MailboxInfo::new("INBOX", true)])
        }

        fn count(&mut self, mailbox: &str, metric: Metric) -> Result<u64> {
            match (mailbox, metric) {
                ("INBOX", Metric::Total) => Ok(42),
                ("INBOX", Metric::Unread) => Ok(3),
                _ => anyhow::bail!("no such mailbox"),
            }
        }

        fn logout(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fetch_today_counts() {
        let counts = fetch_today_counts(
            &mut StaticSource,
            &[
                MailboxSelection::new("INBOX", Metric::Total),
                MailboxSelection::new("INBOX", Metric::Unread),
            ],
        )
        .unwrap();

        assert_eq!(
            counts,
            vec![
                DailyCount::new("INBOX", Metric::Total, 42),
                DailyCount::new("INBOX", Metric::Unread, 3),
            ]
        );
    }

    #[test]
    fn test_fetch_today_counts_fails_whole_batch() {
        let result = fetch_today_counts(
            &mut StaticSource,
            &[
                MailboxSelection::new("INBOX", Metric::Total),
                MailboxSelection::new("Gone", Metric::Total),
            ],
        );
        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("Gone"));
    }
}
