//! Almanac - daily Gmail mailbox counts as a printed publication
//!
//! This is the entry point for the web server.

use std::process;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use mail::{GmailAuth, GmailCredentials, GmailProvider, SqliteKvStore, SystemClock};

mod app;
mod form;
mod http;
mod routes;
mod server;
mod session;
mod settings;
mod templates;

use app::App;
use settings::Settings;

fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    if let Err(e) = run() {
        error!("{:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let settings = Settings::load()?;

    // Nothing works without Google credentials
    let creds = match GmailCredentials::load() {
        Ok(creds) => creds,
        Err(e) => {
            if let Some(path) = GmailCredentials::default_credentials_path() {
                warn!(
                    "To configure Gmail access, either:\n\
                     1. Place your Google OAuth credentials at: {}\n\
                     2. Or set environment variables: GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
                    path.display()
                );
            }
            return Err(e.context("Gmail credentials not found"));
        }
    };

    let db_path = settings.database_path()?;
    let store = SqliteKvStore::new(&db_path)?;
    info!("Using database at {}", db_path.display());

    let provider = GmailProvider::new(GmailAuth::new(creds.client_id, creds.client_secret));
    let app = App::new(settings, Box::new(provider), Arc::new(store), Arc::new(SystemClock));

    server::serve(Arc::new(app))
}
