//! HTML templates
//!
//! Two layouts: the configuration pages a person sees in the browser, and
//! the narrow publication page that gets printed.

use chrono::NaiveDate;
use mail::{
    Edition, EditionMailbox, MailboxInfo, Metric, format_day, format_mailbox_name, format_number,
    pluralize,
};

use crate::form::{FormErrors, FormRow};

const TITLE: &str = "Gmail Almanac";

/// Simple HTML escape for user-generated content
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn config_layout(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ font-family: Helvetica, Arial, sans-serif; max-width: 40em; margin: 2em auto; color: #222; }}
.error {{ color: #b00; }}
label {{ display: inline-block; min-width: 6em; }}
fieldset {{ border: 1px solid #ccc; margin-bottom: 1em; }}
</style>
</head>
<body>
<h1>{title}</h1>
{content}
</body>
</html>"#,
        title = TITLE,
        content = content
    )
}

fn publication_layout(content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
body {{ width: 384px; margin: 0; font-family: Helvetica, Arial, sans-serif; color: #000; background: #fff; }}
h1 {{ font-size: 26px; margin: 0 0 4px; }}
.account {{ font-size: 14px; margin-bottom: 12px; }}
.mailbox {{ border-top: 2px solid #000; padding: 8px 0; }}
.mailbox h2 {{ font-size: 22px; margin: 0; }}
.count {{ font-size: 18px; }}
.chart {{ display: flex; align-items: flex-end; height: 60px; margin-top: 6px; }}
.bar {{ flex: 1; background: #000; margin-right: 1px; }}
.axis {{ display: flex; justify-content: space-between; font-size: 11px; }}
</style>
</head>
<body>
{content}
</body>
</html>"#,
        title = TITLE,
        content = content
    )
}

/// Error page for 4xx/5xx replies
pub fn error_page(message: &str) -> String {
    config_layout(&format!(
        r#"<p class="error">{}</p>"#,
        html_escape(message)
    ))
}

fn metric_options(selected: Metric) -> String {
    Metric::ALL
        .iter()
        .map(|m| {
            format!(
                r#"<option value="{}"{}>{}</option>"#,
                m.as_str(),
                if *m == selected { " selected" } else { "" },
                m.label()
            )
        })
        .collect()
}

fn mailbox_options(mailboxes: &[MailboxInfo], selected: &str) -> String {
    let mut html = String::from(r#"<option value="">(none)</option>"#);
    for mb in mailboxes.iter().filter(|mb| mb.selectable) {
        html.push_str(&format!(
            r#"<option value="{value}"{sel}>{label}</option>"#,
            value = html_escape(&mb.name),
            sel = if mb.name == selected { " selected" } else { "" },
            label = html_escape(&format_mailbox_name(&mb.name))
        ));
    }
    html
}

/// The mailbox selection form
pub fn mailboxes_page(
    email: &str,
    mailboxes: &[MailboxInfo],
    rows: &[FormRow],
    errors: &FormErrors,
) -> String {
    let mut content = format!(
        "<p>Choose up to {} mailboxes from <strong>{}</strong> to appear in your publication.</p>\n",
        rows.len(),
        html_escape(email)
    );

    if let Some(general) = &errors.general {
        content.push_str(&format!(r#"<p class="error">{}</p>"#, html_escape(general)));
    }

    content.push_str(r#"<form method="post" action="/mailboxes/">"#);
    for (i, row) in rows.iter().enumerate() {
        let n = i + 1;
        let error = errors
            .rows
            .get(&n)
            .map(|e| format!(r#"<p class="error">{}</p>"#, html_escape(e)))
            .unwrap_or_default();
        content.push_str(&format!(
            r#"
<fieldset>
{error}
<label for="mailbox-{n}">Mailbox {n}</label>
<select name="mailbox-{n}" id="mailbox-{n}">{mailboxes}</select>
<label for="metric-{n}">Show</label>
<select name="metric-{n}" id="metric-{n}">{metrics}</select>
</fieldset>"#,
            error = error,
            n = n,
            mailboxes = mailbox_options(mailboxes, &row.mailbox),
            metrics = metric_options(row.metric)
        ));
    }
    content.push_str("\n<p><input type=\"submit\" value=\"Save\"></p>\n</form>");

    config_layout(&content)
}

fn chart(mb: &EditionMailbox) -> String {
    let max = mb.history.iter().map(|p| p.count).max().unwrap_or(0).max(1);

    let bars: String = mb
        .history
        .iter()
        .map(|p| {
            let height = p.count * 100 / max;
            format!(
                r#"<div class="bar" style="height: {}%" title="{}: {}"></div>"#,
                height,
                format_day(p.day),
                format_number(p.count)
            )
        })
        .collect();

    let axis = match (mb.history.first(), mb.history.last()) {
        (Some(first), Some(last)) if first.day != last.day => format!(
            r#"<div class="axis"><span>{}</span><span>{}</span></div>"#,
            format_day(first.day),
            format_day(last.day)
        ),
        _ => String::new(),
    };

    format!(r#"<div class="chart">{}</div>{}"#, bars, axis)
}

/// The printed edition
pub fn publication(edition: &Edition, today: NaiveDate) -> String {
    let mut content = format!(
        r#"<h1>{}</h1>
<p class="account">{} &middot; {}</p>"#,
        TITLE,
        html_escape(&edition.email),
        today.format("%A %-d %B %Y")
    );

    for mb in &edition.mailboxes {
        content.push_str(&format!(
            r#"
<div class="mailbox">
<h2>{name}</h2>
<p class="count">{count} {phrase}</p>
{chart}
</div>"#,
            name = html_escape(&format_mailbox_name(&mb.name)),
            count = pluralize(mb.count, "message"),
            phrase = mb.metric.publication_phrase(),
            chart = if edition.days_of_data > 1 { chart(mb) } else { String::new() }
        ));
    }

    if edition.days_of_data > 1 {
        content.push_str(&format!(
            r#"<p class="axis">Showing {}</p>"#,
            pluralize(edition.days_of_data as u64, "day")
        ));
    }

    publication_layout(&content)
}

/// Shown instead of an edition once the user revokes our access
pub fn auth_revoked() -> String {
    publication_layout(&format!(
        r#"<h1>{}</h1>
<p>This publication can no longer read your Gmail because access was revoked.</p>
<p>Please unsubscribe, then subscribe again if you'd like it back.</p>"#,
        TITLE
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail::sample_edition;

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_publication_lists_mailboxes() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let edition = sample_edition(today, 7);
        let html = publication(&edition, today);

        assert!(html.contains("alex.t.andover@gmail.com"));
        assert!(html.contains("<h2>Starred</h2>"));
        assert!(html.contains("from past 24 hrs"));
        assert!(html.contains("Showing 7 days"));
        assert!(html.contains("2024-03-09"));
    }

    #[test]
    fn test_single_day_has_no_chart() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let html = publication(&sample_edition(today, 1), today);
        assert!(!html.contains("class=\"bar\""));
    }

    #[test]
    fn test_mailboxes_page_escapes_and_marks_errors() {
        let mailboxes = vec![
            MailboxInfo::new("INBOX", true),
            MailboxInfo::new("[Gmail]", false),
            MailboxInfo::new("Q&A", true),
        ];
        let rows = vec![FormRow {
            mailbox: "Q&A".to_string(),
            metric: Metric::Daily,
        }];
        let mut errors = FormErrors::default();
        errors.rows.insert(1, "This isn't a valid mailbox name".to_string());

        let html = mailboxes_page("me@gmail.com", &mailboxes, &rows, &errors);
        assert!(html.contains(r#"<option value="Q&amp;A" selected>"#));
        assert!(html.contains(r#"<option value="daily" selected>"#));
        assert!(!html.contains(r#"value="[Gmail]""#));
        assert!(html.contains("This isn&#39;t a valid mailbox name"));
    }
}
