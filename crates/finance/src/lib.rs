//! Finance crate - Business logic for personal finance records
//!
//! This crate provides platform-independent finance functionality including:
//! - Domain models (LedgerEntry, SpendingLimit, PreferenceSettings, Money)
//! - Firestore REST client and OAuth authentication
//! - Local and remote storage trait abstractions
//! - Point-in-time cloud sync engine (push, pull, status)
//!
//! This crate has zero UI dependencies.

pub mod config;
pub mod models;
pub mod remote;
pub mod storage;
pub mod sync;

pub use config::FirebaseCredentials;
pub use models::{
    Direction, LedgerEntry, LimitPeriod, Money, PreferenceSettings, RecordKind, SpendingLimit,
    SyncCursor, PREFERENCES_KEY,
};
pub use remote::{
    DocumentWrite, FirebaseAuth, FirestoreClient, InMemoryRemoteStore, RemoteDocument,
    RemoteStore, ServiceDisabledError, MAX_BATCH_SIZE,
};
pub use storage::{InMemoryLocalStore, InsertBatch, LocalStore, SqliteLocalStore};
pub use sync::{Availability, SyncResult, SyncService, SyncStats, SyncStatus};
