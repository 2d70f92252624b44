//! Local storage traits and implementations
//!
//! This module defines the storage abstraction for the authoritative local
//! relational data. The trait-based design allows swapping between the
//! SQLite store and an in-memory implementation in tests.

mod memory;
mod sqlite;
mod traits;

pub use memory::InMemoryLocalStore;
pub use sqlite::SqliteLocalStore;
pub use traits::{InsertBatch, LocalStore};
