//! Local storage trait definitions

use anyhow::Result;

use crate::models::{LedgerEntry, PreferenceSettings, SpendingLimit};

/// Staged local inserts, applied in one transaction
///
/// Pull accumulates the rows it wants to create here and hands the whole
/// batch to [`LocalStore::apply_inserts`] at the end, so either every staged
/// row becomes visible or none do.
#[derive(Debug, Default)]
pub struct InsertBatch {
    /// New ledger entries
    pub entries: Vec<LedgerEntry>,
    /// New spending limits
    pub limits: Vec<SpendingLimit>,
    /// New preference settings (singleton)
    pub preferences: Option<PreferenceSettings>,
}

impl InsertBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of staged rows
    pub fn len(&self) -> usize {
        self.entries.len() + self.limits.len() + usize::from(self.preferences.is_some())
    }

    /// True if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trait for the authoritative local relational store
///
/// The sync engine consumes this interface but does not own it; row
/// creation and mutation outside of pull belong to the CRUD layer. The
/// engine only reads rows for push, checks identities for pull, and
/// applies pull's staged inserts transactionally.
pub trait LocalStore: Send + Sync {
    /// All non-soft-deleted ledger entries for an account
    fn list_active_entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>>;

    /// All spending limits for an account
    fn list_limits(&self, account_id: &str) -> Result<Vec<SpendingLimit>>;

    /// The account's preference settings, if any
    fn get_preferences(&self, account_id: &str) -> Result<Option<PreferenceSettings>>;

    /// Whether a ledger entry with this local id exists (deleted or not)
    fn has_entry(&self, id: i64) -> Result<bool>;

    /// Whether a spending limit with this local id exists
    fn has_limit(&self, id: i64) -> Result<bool>;

    /// Insert every row in the batch inside a single transaction
    ///
    /// On error nothing is persisted.
    fn apply_inserts(&self, batch: InsertBatch) -> Result<()>;
}
