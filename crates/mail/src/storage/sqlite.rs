//! SQLite-backed key-value storage

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};
use rusqlite_migration::{M, Migrations};

use super::{HashTxn, KvStore};

/// How long a statement waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- One row per hash field
            CREATE TABLE hashes (
                key TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (key, field)
            ) WITHOUT ROWID;
            "#,
        ),
    ])
}

/// SQLite-based key-value storage
///
/// Several server processes may share one database file: WAL mode lets
/// readers run during a write, and `transact` takes the write lock up
/// front with `BEGIN IMMEDIATE`.
pub struct SqliteKvStore {
    conn: Mutex<Connection>,
}

impl SqliteKvStore {
    /// Open (or create) a store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database at {:?}", db_path))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            "#,
        )?;

        Self::with_connection(conn)
    }

    /// Open a private in-memory database (tests)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(mut conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| anyhow!("Database connection lock poisoned"))
    }
}

/// Remove fields of one hash inside an open transaction
fn delete_fields(tx: &Transaction<'_>, key: &str, fields: &[String]) -> Result<usize> {
    let mut stmt = tx.prepare_cached("DELETE FROM hashes WHERE key = ? AND field = ?")?;
    let mut removed = 0;
    for field in fields {
        removed += stmt.execute(params![key, field])?;
    }
    Ok(removed)
}

/// Transaction handle scoped to one hash key
struct SqliteHashTxn<'a> {
    tx: &'a Transaction<'a>,
    key: &'a str,
}

impl HashTxn for SqliteHashTxn<'_> {
    fn set(&mut self, field: &str, value: &str) -> Result<()> {
        self.tx.execute(
            "INSERT INTO hashes (key, field, value) VALUES (?, ?, ?)
             ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            params![self.key, field, value],
        )?;
        Ok(())
    }

    fn fields(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .tx
            .prepare_cached("SELECT field FROM hashes WHERE key = ? ORDER BY field ASC")?;
        let fields = stmt
            .query_map([self.key], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(fields)
    }

    fn remove(&mut self, fields: &[String]) -> Result<usize> {
        delete_fields(self.tx, self.key, fields)
    }
}

impl KvStore for SqliteKvStore {
    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM hashes WHERE key = ? AND field = ?",
                params![key, field],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO hashes (key, field, value) VALUES (?, ?, ?)
             ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            params![key, field, value],
        )?;
        Ok(())
    }

    fn hdel(&self, key: &str, fields: &[String]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = delete_fields(&tx, key, fields)?;
        tx.commit()?;
        Ok(removed)
    }

    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(
            "SELECT field, value FROM hashes WHERE key = ? ORDER BY field ASC",
        )?;
        let rows = stmt
            .query_map([key], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<(String, String)>, _>>()?;
        Ok(rows)
    }

    fn del(&self, key: &str) -> Result<bool> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM hashes WHERE key = ?", [key])?;
        Ok(removed > 0)
    }

    fn transact(
        &self,
        key: &str,
        apply: &mut dyn FnMut(&mut dyn HashTxn) -> Result<()>,
    ) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut txn = SqliteHashTxn { tx: &tx, key };
            // Dropping `tx` on error rolls everything back
            apply(&mut txn)?;
        }
        tx.commit()?;
        Ok(())
    }
}
