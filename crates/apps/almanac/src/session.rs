//! Cookie sessions
//!
//! State for the configuration flow lives in memory, keyed by a random id
//! in the `almanac_session` cookie. Sessions idle longer than
//! [`SESSION_TTL_MINUTES`] are dropped.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use uuid::Uuid;

use crate::form::{FormErrors, FormRow};

pub const SESSION_COOKIE: &str = "almanac_session";

const SESSION_TTL_MINUTES: i64 = 60;

/// Everything remembered between configuration requests
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub return_url: Option<String>,
    pub error_url: Option<String>,
    pub refresh_token: Option<String>,
    /// A rejected submission, shown once on the next form render
    pub rejected_form: Option<(Vec<FormRow>, FormErrors)>,
}

struct Entry {
    session: Session,
    touched: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Entry>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live session id for a cookie value, or a new one.
    ///
    /// The flag is true when the id is new and must be sent as a cookie.
    pub fn resolve(&self, cookie: Option<&str>) -> (String, bool) {
        let now = Utc::now();
        let mut sessions = self.lock();
        sessions.retain(|_, e| now - e.touched < Duration::minutes(SESSION_TTL_MINUTES));

        if let Some(id) = cookie
            && let Some(entry) = sessions.get_mut(id)
        {
            entry.touched = now;
            return (id.to_string(), false);
        }

        let id = Uuid::new_v4().to_string();
        sessions.insert(
            id.clone(),
            Entry {
                session: Session::default(),
                touched: now,
            },
        );
        debug!("[SESSION] Started {}", id);
        (id, true)
    }

    /// A copy of the session's state
    pub fn get(&self, id: &str) -> Session {
        self.lock()
            .get(id)
            .map(|e| e.session.clone())
            .unwrap_or_default()
    }

    pub fn update(&self, id: &str, f: impl FnOnce(&mut Session)) {
        let mut sessions = self.lock();
        let entry = sessions.entry(id.to_string()).or_insert_with(|| Entry {
            session: Session::default(),
            touched: Utc::now(),
        });
        f(&mut entry.session);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // Plain data, so a poisoned lock is still usable
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// `Set-Cookie` value for a session id
pub fn session_cookie(id: &str) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_issued_for_unknown_cookie() {
        let store = SessionStore::new();
        let (id, fresh) = store.resolve(Some("forged"));
        assert!(fresh);
        assert_ne!(id, "forged");

        let (again, fresh) = store.resolve(Some(&id));
        assert!(!fresh);
        assert_eq!(again, id);
    }

    #[test]
    fn test_update_and_get() {
        let store = SessionStore::new();
        let (id, _) = store.resolve(None);
        store.update(&id, |s| s.return_url = Some("https://x.test/r".to_string()));
        assert_eq!(store.get(&id).return_url.as_deref(), Some("https://x.test/r"));
        assert!(store.get("unknown").return_url.is_none());
    }

    #[test]
    fn test_cookie_value() {
        assert_eq!(
            session_cookie("abc"),
            "almanac_session=abc; Path=/; HttpOnly; SameSite=Lax"
        );
    }
}
