//! Shared application state
//!
//! Built once in `main` and shared by every worker thread.

use std::sync::Arc;

use mail::{Clock, HistoryStore, KvStore, MailProvider, Namespace, UserStore};

use crate::session::SessionStore;
use crate::settings::Settings;

/// Root key prefix for everything this server stores
const STORE_PREFIX: &str = "almanac";

pub struct App {
    pub settings: Settings,
    pub provider: Box<dyn MailProvider>,
    pub users: UserStore,
    pub history: HistoryStore,
    pub sessions: SessionStore,
}

impl App {
    pub fn new(
        settings: Settings,
        provider: Box<dyn MailProvider>,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let root = Namespace::new(store, STORE_PREFIX);
        Self {
            settings,
            provider,
            history: HistoryStore::new(root.child("mailboxes"), clock),
            users: UserStore::new(root),
            sessions: SessionStore::new(),
        }
    }
}
