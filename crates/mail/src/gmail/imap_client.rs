//! IMAP access to Gmail mailboxes
//!
//! Connects over TLS, logs in with XOAUTH2 and answers count queries.

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, Local};
use imap::types::{StatusAttribute, UnsolicitedResponse};
use log::debug;
use native_tls::{TlsConnector, TlsStream};
use std::io::{Read, Write};
use std::net::TcpStream;

use crate::models::{MailboxInfo, Metric, order_mailboxes};
use crate::source::MailSource;

/// Gmail's IMAP endpoint
pub const GMAIL_IMAP_HOST: &str = "imap.gmail.com";
const IMAP_PORT: u16 = 993;

/// Socket read/write limit so a stalled server can't hang a request
const IO_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Build the XOAUTH2 initial response: `user=..^Aauth=Bearer ..^A^A`
fn xoauth2_payload(user: &str, access_token: &str) -> String {
    format!("user={}\x01auth=Bearer {}\x01\x01", user, access_token)
}

/// The imap crate base64-encodes whatever we return here
struct XOAuth2 {
    payload: String,
}

impl imap::Authenticator for XOAuth2 {
    type Response = String;

    fn process(&self, _challenge: &[u8]) -> Self::Response {
        self.payload.clone()
    }
}

/// An authenticated IMAP session
pub struct ImapMailSource<T: Read + Write = TlsStream<TcpStream>> {
    session: imap::Session<T>,
}

impl<T: Read + Write> ImapMailSource<T> {
    /// Wrap an already authenticated session
    pub fn from_session(session: imap::Session<T>) -> Self {
        Self { session }
    }

    /// Run `STATUS mailbox (item)` and read the item back.
    ///
    /// The imap crate delivers STATUS data on the unsolicited channel,
    /// not in the returned `Mailbox`.
    fn status_count(&mut self, mailbox: &str, item: &str) -> Result<u64> {
        // Anything queued earlier belongs to a previous command
        while self.session.unsolicited_responses.try_recv().is_ok() {}

        self.session
            .status(mailbox, format!("({})", item))
            .with_context(|| format!("STATUS {} failed", mailbox))?;

        for response in self.session.unsolicited_responses.try_iter() {
            let UnsolicitedResponse::Status { attributes, .. } = response else {
                continue;
            };
            for attr in attributes {
                match (item, attr) {
                    ("MESSAGES", StatusAttribute::Messages(n)) => return Ok(u64::from(n)),
                    ("UNSEEN", StatusAttribute::Unseen(n)) => return Ok(u64::from(n)),
                    _ => {}
                }
            }
        }

        Err(anyhow!("Server sent no {} count for {}", item, mailbox))
    }
}

impl ImapMailSource {
    /// Connect and authenticate as `user` with an OAuth2 access token
    pub fn connect(host: &str, user: &str, access_token: &str) -> Result<Self> {
        let tls = TlsConnector::builder().build()?;

        let tcp = TcpStream::connect((host, IMAP_PORT))
            .with_context(|| format!("Failed to connect to {}:{}", host, IMAP_PORT))?;
        tcp.set_read_timeout(Some(IO_TIMEOUT))?;
        tcp.set_write_timeout(Some(IO_TIMEOUT))?;

        let stream = tls
            .connect(host, tcp)
            .map_err(|e| anyhow!("TLS handshake with {} failed: {}", host, e))?;

        let mut client = imap::Client::new(stream);
        client.read_greeting().context("Failed to read IMAP greeting")?;

        let auth = XOAuth2 {
            payload: xoauth2_payload(user, access_token),
        };
        let session = client
            .authenticate("XOAUTH2", &auth)
            .map_err(|(e, _)| anyhow!("XOAUTH2 authentication failed: {}", e))?;

        debug!("[IMAP] Authenticated {} at {}", user, host);
        Ok(Self { session })
    }
}

/// IMAP SEARCH date for "received in the last 24 hours"
///
/// SINCE only has day granularity, so this counts from the start of
/// yesterday.
fn since_yesterday() -> String {
    (Local::now() - Duration::hours(24))
        .format("%d-%b-%Y")
        .to_string()
}

impl<T: Read + Write> MailSource for ImapMailSource<T> {
    fn list_mailboxes(&mut self) -> Result<Vec<MailboxInfo>> {
        let names = self
            .session
            .list(Some(""), Some("*"))
            .context("Failed to list mailboxes")?;

        let mailboxes = names
            .iter()
            .map(|name| {
                let selectable = !name
                    .attributes()
                    .iter()
                    .any(|attr| matches!(attr, imap::types::NameAttribute::NoSelect));
                MailboxInfo::new(name.name(), selectable)
            })
            .collect();

        Ok(order_mailboxes(mailboxes))
    }

    fn count(&mut self, mailbox: &str, metric: Metric) -> Result<u64> {
        let count = match metric {
            Metric::Total => self.status_count(mailbox, "MESSAGES")?,
            Metric::Unread => self.status_count(mailbox, "UNSEEN")?,
            Metric::Flagged => {
                self.session.examine(mailbox)?;
                self.session.search("FLAGGED")?.len() as u64
            }
            Metric::Daily => {
                self.session.examine(mailbox)?;
                self.session
                    .search(format!("SINCE {}", since_yesterday()))?
                    .len() as u64
            }
        };

        debug!("[IMAP] {} {} = {}", mailbox, metric, count);
        Ok(count)
    }

    fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        Ok(())
    }
}
