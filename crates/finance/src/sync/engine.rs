//! Cloud sync engine
//!
//! Point-in-time, user-triggered transfers between the local store and the
//! remote document replica. Push mirrors local state outward, pull merges
//! remote documents inward (insert-only), status reports the last push.
//!
//! The service is constructed once at startup with its remote store
//! injected and passed by reference to whatever surface triggers sync.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::availability::Availability;
use crate::models::{
    LedgerEntry, PreferenceSettings, RecordKind, SpendingLimit, SyncCursor, PREFERENCES_KEY,
};
use crate::remote::{DocumentWrite, RemoteStore, MAX_BATCH_SIZE};
use crate::storage::{InsertBatch, LocalStore};

/// Failure text when the remote store is unavailable
const SYNC_UNAVAILABLE: &str = "Cloud sync not available";

/// Per-kind row counts from a push or pull
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    /// Ledger entries written (push) or created locally (pull)
    pub ledger_entries: usize,
    /// Spending limits written or created
    pub spending_limits: usize,
    /// Preference documents written or created (0 or 1)
    pub preferences: usize,
}

/// Structured outcome of one push or pull
///
/// On failure `stats` carries no meaning; callers should only surface the
/// error text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Whether the whole operation completed
    pub success: bool,
    /// Per-kind counts
    pub stats: SyncStats,
    /// When the operation finished
    pub timestamp: DateTime<Utc>,
    /// Error text when `success` is false
    pub error: Option<String>,
}

impl SyncResult {
    fn completed(stats: SyncStats) -> Self {
        Self {
            success: true,
            stats,
            timestamp: Utc::now(),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            stats: SyncStats::default(),
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Sync state of an account as reported to the UI
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    /// Whether cloud sync is available at all
    pub enabled: bool,
    /// Instant of the last successful push, if any
    pub last_sync: Option<DateTime<Utc>>,
    /// Whether any push has ever succeeded for this account
    pub has_remote_data: bool,
}

impl SyncStatus {
    fn disabled() -> Self {
        Self {
            enabled: false,
            last_sync: None,
            has_remote_data: false,
        }
    }
}

/// The sync engine
///
/// Holds the injected remote store and the availability value probed at
/// construction. The local store is supplied per call by the caller, which
/// owns its lifecycle. A per-account advisory lock serializes concurrent
/// push/pull invocations for the same account.
pub struct SyncService {
    remote: Arc<dyn RemoteStore>,
    availability: Availability,
    // One entry per distinct account id seen this process, never evicted;
    // a process syncs a handful of accounts at most.
    account_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncService {
    /// Construct the service, probing the remote store once
    pub fn connect(remote: Arc<dyn RemoteStore>) -> Self {
        let availability = Availability::probe(remote.as_ref());
        Self::with_availability(remote, availability)
    }

    /// Construct with a pre-computed availability value (tests, or callers
    /// that probe on their own schedule)
    pub fn with_availability(remote: Arc<dyn RemoteStore>, availability: Availability) -> Self {
        Self {
            remote,
            availability,
            account_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Whether cloud sync is available
    pub fn is_available(&self) -> bool {
        self.availability.is_available()
    }

    /// Advisory lock for one account, created on first use
    fn account_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.account_locks.lock().unwrap();
        locks.entry(account_id.to_string()).or_default().clone()
    }

    /// Push all of an account's eligible local rows to the remote store
    ///
    /// Kinds are processed in a fixed order: ledger entries, spending
    /// limits, preferences. Not transactional across kinds: a failure
    /// leaves earlier kinds' documents in place, skips the cursor update
    /// and reports a single failure result.
    pub fn push(&self, account_id: &str, store: &dyn LocalStore) -> SyncResult {
        if !self.is_available() {
            return SyncResult::failed(SYNC_UNAVAILABLE);
        }
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().unwrap();

        match self.push_all(account_id, store) {
            Ok(stats) => {
                info!("Cloud push completed for account {}: {:?}", account_id, stats);
                SyncResult::completed(stats)
            }
            Err(e) => {
                error!("Cloud push failed for account {}: {:#}", account_id, e);
                SyncResult::failed(format!("{:#}", e))
            }
        }
    }

    fn push_all(&self, account_id: &str, store: &dyn LocalStore) -> Result<SyncStats> {
        let stats = SyncStats {
            ledger_entries: self.push_entries(account_id, store)?,
            spending_limits: self.push_limits(account_id, store)?,
            preferences: self.push_preferences(account_id, store)?,
        };

        self.remote
            .set_cursor(account_id, &SyncCursor::now())
            .context("Failed to record sync cursor")?;
        Ok(stats)
    }

    fn push_entries(&self, account_id: &str, store: &dyn LocalStore) -> Result<usize> {
        let writes: Vec<DocumentWrite> = store
            .list_active_entries(account_id)?
            .iter()
            .map(|entry| DocumentWrite {
                kind: RecordKind::LedgerEntry,
                key: entry.id.to_string(),
                fields: entry.to_document(),
            })
            .collect();
        self.flush(account_id, writes)
    }

    fn push_limits(&self, account_id: &str, store: &dyn LocalStore) -> Result<usize> {
        let writes: Vec<DocumentWrite> = store
            .list_limits(account_id)?
            .iter()
            .map(|limit| DocumentWrite {
                kind: RecordKind::SpendingLimit,
                key: limit.id.to_string(),
                fields: limit.to_document(),
            })
            .collect();
        self.flush(account_id, writes)
    }

    fn push_preferences(&self, account_id: &str, store: &dyn LocalStore) -> Result<usize> {
        let writes: Vec<DocumentWrite> = store
            .get_preferences(account_id)?
            .iter()
            .map(|prefs| DocumentWrite {
                kind: RecordKind::Preferences,
                key: PREFERENCES_KEY.to_string(),
                fields: prefs.to_document(),
            })
            .collect();
        self.flush(account_id, writes)
    }

    /// Flush staged writes in enumeration order, chunked to the remote
    /// store's batch ceiling; the final partial batch is always flushed,
    /// and zero writes commit nothing
    fn flush(&self, account_id: &str, writes: Vec<DocumentWrite>) -> Result<usize> {
        let count = writes.len();
        let mut head = writes;
        while !head.is_empty() {
            let tail = head.split_off(head.len().min(MAX_BATCH_SIZE));
            self.remote.commit_batch(account_id, head)?;
            head = tail;
        }
        Ok(count)
    }

    /// Pull remote documents into the local store, creating only rows that
    /// are absent locally
    ///
    /// Existing local rows are never overwritten or merged, regardless of
    /// which side is newer. All staged rows are committed in one local
    /// transaction; any failure rolls the whole pull back.
    pub fn pull(&self, account_id: &str, store: &dyn LocalStore) -> SyncResult {
        if !self.is_available() {
            return SyncResult::failed(SYNC_UNAVAILABLE);
        }
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().unwrap();

        match self.pull_all(account_id, store) {
            Ok(stats) => {
                info!("Cloud pull completed for account {}: {:?}", account_id, stats);
                SyncResult::completed(stats)
            }
            Err(e) => {
                error!("Cloud pull failed for account {}: {:#}", account_id, e);
                SyncResult::failed(format!("{:#}", e))
            }
        }
    }

    fn pull_all(&self, account_id: &str, store: &dyn LocalStore) -> Result<SyncStats> {
        let mut batch = InsertBatch::new();
        let stats = SyncStats {
            ledger_entries: self.stage_entries(account_id, store, &mut batch)?,
            spending_limits: self.stage_limits(account_id, store, &mut batch)?,
            preferences: self.stage_preferences(account_id, store, &mut batch)?,
        };

        store
            .apply_inserts(batch)
            .context("Failed to commit pulled rows")?;
        Ok(stats)
    }

    fn stage_entries(
        &self,
        account_id: &str,
        store: &dyn LocalStore,
        batch: &mut InsertBatch,
    ) -> Result<usize> {
        let mut created = 0;
        for doc in self
            .remote
            .stream_collection(account_id, RecordKind::LedgerEntry)?
        {
            let id = parse_document_id(&doc.key)?;
            if store.has_entry(id)? {
                continue;
            }
            batch
                .entries
                .push(LedgerEntry::from_document(id, account_id, &doc.fields)?);
            created += 1;
        }
        Ok(created)
    }

    fn stage_limits(
        &self,
        account_id: &str,
        store: &dyn LocalStore,
        batch: &mut InsertBatch,
    ) -> Result<usize> {
        let mut created = 0;
        for doc in self
            .remote
            .stream_collection(account_id, RecordKind::SpendingLimit)?
        {
            let id = parse_document_id(&doc.key)?;
            if store.has_limit(id)? {
                continue;
            }
            batch
                .limits
                .push(SpendingLimit::from_document(id, account_id, &doc.fields)?);
            created += 1;
        }
        Ok(created)
    }

    fn stage_preferences(
        &self,
        account_id: &str,
        store: &dyn LocalStore,
        batch: &mut InsertBatch,
    ) -> Result<usize> {
        if store.get_preferences(account_id)?.is_some() {
            return Ok(0);
        }
        let Some(doc) =
            self.remote
                .get_document(account_id, RecordKind::Preferences, PREFERENCES_KEY)?
        else {
            return Ok(0);
        };
        batch.preferences = Some(PreferenceSettings::from_document(account_id, &doc.fields)?);
        Ok(1)
    }

    /// Report the account's sync state without touching the local store
    ///
    /// Degrades to a disabled status on any remote failure; status is a
    /// read-only convenience and must never surface as a hard error.
    pub fn status(&self, account_id: &str) -> SyncStatus {
        if !self.is_available() {
            return SyncStatus::disabled();
        }

        match self.remote.get_cursor(account_id) {
            Ok(Some(cursor)) => SyncStatus {
                enabled: true,
                last_sync: Some(cursor.last_sync),
                has_remote_data: true,
            },
            Ok(None) => SyncStatus {
                enabled: true,
                last_sync: None,
                has_remote_data: false,
            },
            Err(e) => {
                error!("Failed to read sync status for {}: {:#}", account_id, e);
                SyncStatus::disabled()
            }
        }
    }
}

/// Parse a remote document key back into a local integer identity
fn parse_document_id(key: &str) -> Result<i64> {
    key.parse()
        .with_context(|| format!("Document key '{}' is not a local id", key))
}
