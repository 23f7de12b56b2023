//! In-memory storage implementation
//!
//! Used for tests and for running the server without a database file.

use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{HashTxn, KvStore};

type Hashes = HashMap<String, BTreeMap<String, String>>;

/// In-memory implementation of KvStore
///
/// Uses a HashMap of BTreeMaps behind one RwLock, so fields come back
/// sorted and transactions are serialized by the write lock.
pub struct InMemoryKvStore {
    hashes: RwLock<Hashes>,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            hashes: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Hashes>> {
        self.hashes.read().map_err(|_| anyhow!("In-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Hashes>> {
        self.hashes.write().map_err(|_| anyhow!("In-memory store lock poisoned"))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Transaction over a scratch copy of one hash
struct MemoryHashTxn<'a> {
    hash: &'a mut BTreeMap<String, String>,
}

impl HashTxn for MemoryHashTxn<'_> {
    fn set(&mut self, field: &str, value: &str) -> Result<()> {
        self.hash.insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn fields(&self) -> Result<Vec<String>> {
        Ok(self.hash.keys().cloned().collect())
    }

    fn remove(&mut self, fields: &[String]) -> Result<usize> {
        Ok(fields
            .iter()
            .filter(|field| self.hash.remove(field.as_str()).is_some())
            .count())
    }
}

impl KvStore for InMemoryKvStore {
    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let hashes = self.read()?;
        Ok(hashes.get(key).and_then(|h| h.get(field)).cloned())
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let mut hashes = self.write()?;
        hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn hdel(&self, key: &str, fields: &[String]) -> Result<usize> {
        let mut hashes = self.write()?;
        let Some(hash) = hashes.get_mut(key) else {
            return Ok(0);
        };

        let removed = fields
            .iter()
            .filter(|field| hash.remove(field.as_str()).is_some())
            .count();

        // Empty hashes don't exist, same as a remote hash store
        if hash.is_empty() {
            hashes.remove(key);
        }

        Ok(removed)
    }

    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        let hashes = self.read()?;
        Ok(hashes
            .get(key)
            .map(|h| h.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    fn del(&self, key: &str) -> Result<bool> {
        let mut hashes = self.write()?;
        Ok(hashes.remove(key).is_some())
    }

    fn transact(
        &self,
        key: &str,
        apply: &mut dyn FnMut(&mut dyn HashTxn) -> Result<()>,
    ) -> Result<()> {
        let mut hashes = self.write()?;

        // Work on a copy so a failed closure leaves the hash untouched
        let mut scratch = hashes.get(key).cloned().unwrap_or_default();
        apply(&mut MemoryHashTxn { hash: &mut scratch })?;

        if scratch.is_empty() {
            hashes.remove(key);
        } else {
            hashes.insert(key.to_string(), scratch);
        }
        Ok(())
    }
}
