//! Storage traits and implementations
//!
//! This module defines the key-value abstraction the stores are built on.
//! The trait-based design allows swapping between in-memory and SQLite
//! storage implementations.

mod memory;
mod namespace;
mod sqlite;
mod traits;
mod users;

pub use memory::InMemoryKvStore;
pub use namespace::Namespace;
pub use sqlite::SqliteKvStore;
pub use traits::{HashTxn, KvStore};
pub use users::UserStore;
