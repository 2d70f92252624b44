//! In-memory local storage implementation
//!
//! Used in tests as a stand-in for the SQLite store.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{InsertBatch, LocalStore};
use crate::models::{LedgerEntry, PreferenceSettings, SpendingLimit};

/// In-memory implementation of [`LocalStore`]
///
/// HashMaps behind RwLocks, keyed by local id (preferences by account).
pub struct InMemoryLocalStore {
    entries: RwLock<HashMap<i64, LedgerEntry>>,
    limits: RwLock<HashMap<i64, SpendingLimit>>,
    preferences: RwLock<HashMap<String, PreferenceSettings>>,
}

impl InMemoryLocalStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            limits: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a ledger entry directly (test seeding; the CRUD layer's job
    /// in production)
    pub fn insert_entry(&self, entry: LedgerEntry) {
        self.entries.write().unwrap().insert(entry.id, entry);
    }

    /// Insert a spending limit directly
    pub fn insert_limit(&self, limit: SpendingLimit) {
        self.limits.write().unwrap().insert(limit.id, limit);
    }

    /// Set an account's preferences directly
    pub fn set_preferences(&self, prefs: PreferenceSettings) {
        self.preferences
            .write()
            .unwrap()
            .insert(prefs.account_id.clone(), prefs);
    }

    /// Fetch one entry by id (including soft-deleted ones)
    pub fn get_entry(&self, id: i64) -> Option<LedgerEntry> {
        self.entries.read().unwrap().get(&id).cloned()
    }

    /// Fetch one limit by id
    pub fn get_limit(&self, id: i64) -> Option<SpendingLimit> {
        self.limits.read().unwrap().get(&id).cloned()
    }

    /// Count all entries, deleted included
    pub fn count_entries(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

impl Default for InMemoryLocalStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStore for InMemoryLocalStore {
    fn list_active_entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        let entries = self.entries.read().unwrap();
        let mut rows: Vec<LedgerEntry> = entries
            .values()
            .filter(|e| e.account_id == account_id && !e.is_deleted)
            .cloned()
            .collect();
        rows.sort_by_key(|e| e.id);
        Ok(rows)
    }

    fn list_limits(&self, account_id: &str) -> Result<Vec<SpendingLimit>> {
        let limits = self.limits.read().unwrap();
        let mut rows: Vec<SpendingLimit> = limits
            .values()
            .filter(|l| l.account_id == account_id)
            .cloned()
            .collect();
        rows.sort_by_key(|l| l.id);
        Ok(rows)
    }

    fn get_preferences(&self, account_id: &str) -> Result<Option<PreferenceSettings>> {
        Ok(self.preferences.read().unwrap().get(account_id).cloned())
    }

    fn has_entry(&self, id: i64) -> Result<bool> {
        Ok(self.entries.read().unwrap().contains_key(&id))
    }

    fn has_limit(&self, id: i64) -> Result<bool> {
        Ok(self.limits.read().unwrap().contains_key(&id))
    }

    fn apply_inserts(&self, batch: InsertBatch) -> Result<()> {
        // Validate the whole batch before touching anything, since there is
        // no rollback once insertion starts.
        {
            let entries = self.entries.read().unwrap();
            let limits = self.limits.read().unwrap();
            for entry in &batch.entries {
                if entries.contains_key(&entry.id) {
                    bail!("Ledger entry {} already exists", entry.id);
                }
            }
            for limit in &batch.limits {
                if limits.contains_key(&limit.id) {
                    bail!("Spending limit {} already exists", limit.id);
                }
            }
        }

        let mut entries = self.entries.write().unwrap();
        let mut limits = self.limits.write().unwrap();
        let mut preferences = self.preferences.write().unwrap();

        for entry in batch.entries {
            entries.insert(entry.id, entry);
        }
        for limit in batch.limits {
            limits.insert(limit.id, limit);
        }
        if let Some(prefs) = batch.preferences {
            preferences.insert(prefs.account_id.clone(), prefs);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, Money};
    use chrono::NaiveDate;

    fn entry(id: i64, account: &str) -> LedgerEntry {
        LedgerEntry::new(
            id,
            account,
            Money::from_cents(500),
            Direction::Outflow,
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        )
    }

    #[test]
    fn test_list_active_excludes_deleted() {
        let store = InMemoryLocalStore::new();
        store.insert_entry(entry(1, "a"));
        store.insert_entry(entry(2, "a").deleted());
        store.insert_entry(entry(3, "b"));

        let active = store.list_active_entries("a").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
        // Deleted row still exists for identity checks
        assert!(store.has_entry(2).unwrap());
    }

    #[test]
    fn test_apply_inserts_rejects_duplicates() {
        let store = InMemoryLocalStore::new();
        store.insert_entry(entry(1, "a"));

        let mut batch = InsertBatch::new();
        batch.entries.push(entry(1, "a"));
        assert!(store.apply_inserts(batch).is_err());
        assert_eq!(store.count_entries(), 1);
    }

    #[test]
    fn test_apply_inserts_all_kinds() {
        let store = InMemoryLocalStore::new();
        let mut batch = InsertBatch::new();
        batch.entries.push(entry(1, "a"));
        batch.preferences = Some(PreferenceSettings::new("a").with_theme("dark"));
        store.apply_inserts(batch).unwrap();

        assert!(store.has_entry(1).unwrap());
        assert_eq!(store.get_preferences("a").unwrap().unwrap().theme, "dark");
    }
}
