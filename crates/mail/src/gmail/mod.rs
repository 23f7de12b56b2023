//! Gmail integration
//!
//! This module provides:
//! - OAuth2 authorization code flow and token refresh
//! - IMAP (XOAUTH2) access for listing and counting mailboxes
//! - The `MailProvider` seam the web front end talks to

mod auth;
mod imap_client;
mod provider;

pub use auth::{AuthError, GmailAuth, Grant};
pub use imap_client::{GMAIL_IMAP_HOST, ImapMailSource};
pub use provider::{GmailProvider, MailProvider, MailSession};
