//! Storage trait definitions

use anyhow::Result;

/// Trait for key-value storage operations
///
/// Models a store of named hashes: each key maps to a set of
/// field -> value pairs. This abstracts over different backends
/// (in-memory, SQLite) the same way a remote hash store would be used.
pub trait KvStore: Send + Sync {
    /// Get one field of a hash
    fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Set one field of a hash, creating the hash if needed
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Delete fields from a hash, returning how many existed
    fn hdel(&self, key: &str, fields: &[String]) -> Result<usize>;

    /// All fields of a hash, ordered by field ascending
    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>>;

    /// Delete a whole hash, returning whether it existed
    fn del(&self, key: &str) -> Result<bool>;

    /// Run a read-modify-write against one hash atomically
    ///
    /// Either every change made through the [`HashTxn`] is applied, or
    /// (when `apply` returns an error) none of them are.
    fn transact(&self, key: &str, apply: &mut dyn FnMut(&mut dyn HashTxn) -> Result<()>)
    -> Result<()>;
}

/// Operations available on a single hash inside [`KvStore::transact`]
pub trait HashTxn {
    /// Set a field
    fn set(&mut self, field: &str, value: &str) -> Result<()>;

    /// Field names, ordered ascending
    fn fields(&self) -> Result<Vec<String>>;

    /// Remove fields in one batch, returning how many existed
    fn remove(&mut self, fields: &[String]) -> Result<usize>;
}
