//! Key prefixing over a shared store

use std::sync::Arc;

use super::KvStore;

/// A view of a [`KvStore`] where every key lives under a prefix
///
/// `Namespace::new(store, "almanac").child("mailboxes")` maps the key
/// `abc` to `almanac:mailboxes:abc`.
#[derive(Clone)]
pub struct Namespace {
    store: Arc<dyn KvStore>,
    prefix: String,
}

impl Namespace {
    pub fn new(store: Arc<dyn KvStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    /// A nested namespace sharing the same store
    pub fn child(&self, name: &str) -> Self {
        Self {
            store: Arc::clone(&self.store),
            prefix: self.key(name),
        }
    }

    /// The fully qualified key for `key`
    pub fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }
}
