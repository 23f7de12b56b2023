//! Display formatting for editions

use chrono::NaiveDate;

const GMAIL_PREFIX: &str = "[Gmail]/";

/// Make a mailbox name readable on narrow paper.
///
/// Drops Gmail's `[Gmail]/` prefix and puts a zero-width space after each
/// remaining `/` so long paths can wrap: `Project/Folder` becomes
/// `Project/\u{200B}Folder`.
pub fn format_mailbox_name(name: &str) -> String {
    let name = name.strip_prefix(GMAIL_PREFIX).unwrap_or(name);
    name.replace('/', "/\u{200B}")
}

/// Thousands separators: 1234567 -> "1,234,567"
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// ISO date for chart labels
pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// "1 message", "2 messages"
pub fn pluralize(n: u64, word: &str) -> String {
    if n == 1 {
        format!("{} {}", format_number(n), word)
    } else {
        format!("{} {}s", format_number(n), word)
    }
}
