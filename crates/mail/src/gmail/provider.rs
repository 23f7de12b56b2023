//! Mail provider: OAuth plus mailbox access behind one seam

use log::info;

use super::auth::{AuthError, Grant, GmailAuth};
use super::imap_client::{GMAIL_IMAP_HOST, ImapMailSource};
use crate::source::MailSource;

/// An open, authenticated connection to a user's mail
pub struct MailSession {
    /// The account's email address
    pub email: String,
    pub source: Box<dyn MailSource>,
}

impl MailSession {
    /// Log out, logging rather than failing; the work is already done
    pub fn close(mut self) {
        if let Err(e) = self.source.logout() {
            log::warn!("[MAIL] Logout for {} failed: {:#}", self.email, e);
        }
    }
}

/// Everything the web front end needs from the mail provider
pub trait MailProvider: Send + Sync {
    /// Where to send the user to approve access
    fn authorize_url(&self, redirect_uri: &str) -> String;

    /// Trade the returned code for tokens
    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Grant, AuthError>;

    /// Re-authenticate from a refresh token and open the mailboxes
    fn open(&self, refresh_token: &str) -> Result<MailSession, AuthError>;
}

/// Google OAuth + Gmail IMAP
pub struct GmailProvider {
    auth: GmailAuth,
    imap_host: String,
}

impl GmailProvider {
    pub fn new(auth: GmailAuth) -> Self {
        Self {
            auth,
            imap_host: GMAIL_IMAP_HOST.to_string(),
        }
    }
}

impl MailProvider for GmailProvider {
    fn authorize_url(&self, redirect_uri: &str) -> String {
        self.auth.authorize_url(redirect_uri)
    }

    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Grant, AuthError> {
        self.auth.exchange_code(code, redirect_uri)
    }

    fn open(&self, refresh_token: &str) -> Result<MailSession, AuthError> {
        let access_token = self.auth.refresh(refresh_token)?;
        let email = self.auth.user_email(&access_token)?;

        let source = ImapMailSource::connect(&self.imap_host, &email, &access_token)
            .map_err(AuthError::Mailbox)?;

        info!("[MAIL] Opened mailboxes for {}", email);
        Ok(MailSession {
            email,
            source: Box::new(source),
        })
    }
}
