//! OAuth credential loading
//!
//! Supports loading Google OAuth credentials from (in order of priority):
//! 1. Environment variables (`GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`)
//! 2. JSON file in the Almanac config directory (Google Cloud Console format)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename in the Almanac config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

const CLIENT_ID_VAR: &str = "GOOGLE_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "GOOGLE_CLIENT_SECRET";

/// OAuth credentials for Google access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    web: Option<ClientCredentials>,
    installed: Option<ClientCredentials>,
}

#[derive(Deserialize)]
struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from the environment, then the config file.
    ///
    /// Missing credentials are a startup error: nothing works without them.
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_env() {
            return Ok(creds);
        }

        if config::config_exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = config::load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        anyhow::bail!(
            "{} / {} are not set and no {} was found",
            CLIENT_ID_VAR,
            CLIENT_SECRET_VAR,
            CREDENTIALS_FILE
        )
    }

    /// Load credentials from environment variables, if both are set
    pub fn from_env() -> Option<Self> {
        let client_id = config::env_string(CLIENT_ID_VAR)?;
        let client_secret = config::env_string(CLIENT_SECRET_VAR)?;
        Some(Self {
            client_id,
            client_secret,
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // A server uses "web" credentials, but accept "installed" too
        let client = creds
            .web
            .or(creds.installed)
            .context("Credentials file missing 'web' or 'installed' section")?;

        Ok(Self {
            client_id: client.client_id,
            client_secret: client.client_secret,
        })
    }

    /// Get the default credentials file path (~/.config/almanac/google-credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}
