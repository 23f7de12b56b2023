//! Server settings
//!
//! Read from `~/.config/almanac/almanac.json` when present, then
//! overridden by `ALMANAC_*` environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

const SETTINGS_FILE: &str = "almanac.json";
const DATABASE_FILE: &str = "almanac.db";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the HTTP server listens on
    pub bind: String,
    /// Externally visible base URL, used for OAuth redirects
    pub public_url: String,
    /// SQLite database path; defaults to the data directory
    pub database: Option<PathBuf>,
    /// Request worker threads
    pub workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            public_url: "http://localhost:8080".to_string(),
            database: None,
            workers: 4,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let mut settings: Settings = config::load_json_or_default(SETTINGS_FILE)?;
        settings.apply_env()?;
        Ok(settings)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(bind) = config::env_string("ALMANAC_BIND") {
            self.bind = bind;
        }
        if let Some(url) = config::env_string("ALMANAC_PUBLIC_URL") {
            self.public_url = url;
        }
        if let Some(path) = config::env_string("ALMANAC_DATABASE") {
            self.database = Some(PathBuf::from(path));
        }
        if let Some(workers) = config::env_parse::<usize>("ALMANAC_WORKERS")? {
            self.workers = workers;
        }
        Ok(())
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => config::data_path(DATABASE_FILE).context("Could not determine data directory"),
        }
    }

    /// Absolute URL for one of our own paths
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.public_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{ "public_url": "https://almanac.example.com" }"#).unwrap();
        assert_eq!(settings.public_url, "https://almanac.example.com");
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_url() {
        let settings = Settings {
            public_url: "https://almanac.example.com/".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.url("/return/"), "https://almanac.example.com/return/");
    }

    #[test]
    fn test_explicit_database_path() {
        let settings = Settings {
            database: Some(PathBuf::from("/tmp/almanac.db")),
            ..Settings::default()
        };
        assert_eq!(settings.database_path().unwrap(), PathBuf::from("/tmp/almanac.db"));
    }
}
