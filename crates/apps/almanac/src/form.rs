//! Mailbox selection form
//!
//! The form has `MAX_MAILBOXES` rows, each a `mailbox-N` / `metric-N`
//! pair numbered from 1.

use std::collections::BTreeMap;

use mail::{MAX_MAILBOXES, MailboxSelection, Metric};

/// One row of the form as the user left it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormRow {
    pub mailbox: String,
    pub metric: Metric,
}

/// What went wrong with a submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    /// Applies to the form as a whole
    pub general: Option<String>,
    /// Keyed by row number, from 1
    pub rows: BTreeMap<usize, String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.general.is_none() && self.rows.is_empty()
    }
}

/// Rows for a fresh form: INBOX first, the rest blank
pub fn default_rows() -> Vec<FormRow> {
    (1..=MAX_MAILBOXES)
        .map(|n| FormRow {
            mailbox: if n == 1 {
                mail::MailboxInfo::INBOX.to_string()
            } else {
                String::new()
            },
            metric: Metric::default(),
        })
        .collect()
}

/// Read every row from submitted form pairs.
///
/// Missing mailboxes are blank; unknown or missing metrics fall back to
/// the default.
pub fn parse_rows(lookup: impl Fn(&str) -> Option<String>) -> Vec<FormRow> {
    (1..=MAX_MAILBOXES)
        .map(|n| FormRow {
            mailbox: lookup(&format!("mailbox-{}", n)).unwrap_or_default(),
            metric: lookup(&format!("metric-{}", n))
                .and_then(|m| m.parse().ok())
                .unwrap_or_default(),
        })
        .collect()
}

/// Turn rows into a selection, accepting only names in `selectable`
pub fn validate(rows: &[FormRow], selectable: &[String]) -> Result<Vec<MailboxSelection>, FormErrors> {
    let mut errors = FormErrors::default();
    let mut selection = Vec::new();

    for (i, row) in rows.iter().enumerate().take(MAX_MAILBOXES) {
        if row.mailbox.is_empty() {
            continue;
        }
        if selectable.iter().any(|name| *name == row.mailbox) {
            selection.push(MailboxSelection::new(row.mailbox.clone(), row.metric));
        } else {
            errors
                .rows
                .insert(i + 1, "This isn't a valid mailbox name".to_string());
        }
    }

    if selection.is_empty() {
        errors.general = Some("Please select at least one mailbox".to_string());
    }

    if errors.is_empty() {
        Ok(selection)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectable() -> Vec<String> {
        vec!["INBOX".to_string(), "[Gmail]/Starred".to_string()]
    }

    fn rows(pairs: &[(&str, &str)]) -> Vec<FormRow> {
        parse_rows(|name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn test_default_rows() {
        let rows = default_rows();
        assert_eq!(rows.len(), MAX_MAILBOXES);
        assert_eq!(rows[0].mailbox, "INBOX");
        assert!(rows[1..].iter().all(|r| r.mailbox.is_empty()));
    }

    #[test]
    fn test_valid_selection() {
        let rows = rows(&[
            ("mailbox-1", "INBOX"),
            ("metric-1", "unread"),
            ("mailbox-3", "[Gmail]/Starred"),
            ("metric-3", "flagged"),
        ]);
        let selection = validate(&rows, &selectable()).unwrap();
        assert_eq!(
            selection,
            vec![
                MailboxSelection::new("INBOX", Metric::Unread),
                MailboxSelection::new("[Gmail]/Starred", Metric::Flagged),
            ]
        );
    }

    #[test]
    fn test_unknown_metric_falls_back() {
        let rows = rows(&[("mailbox-1", "INBOX"), ("metric-1", "weekly")]);
        let selection = validate(&rows, &selectable()).unwrap();
        assert_eq!(selection, vec![MailboxSelection::new("INBOX", Metric::Total)]);
    }

    #[test]
    fn test_unknown_mailbox_rejected() {
        let rows = rows(&[("mailbox-1", "INBOX"), ("mailbox-2", "Nope")]);
        let errors = validate(&rows, &selectable()).unwrap_err();
        assert_eq!(errors.rows.get(&2).map(String::as_str), Some("This isn't a valid mailbox name"));
        assert!(errors.general.is_none());
    }

    #[test]
    fn test_empty_selection_rejected() {
        let errors = validate(&rows(&[]), &selectable()).unwrap_err();
        assert_eq!(errors.general.as_deref(), Some("Please select at least one mailbox"));
    }
}
