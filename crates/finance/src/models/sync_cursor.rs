//! Sync cursor tracking the last successful push per account

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Remote-side marker of the last successful push for an account
///
/// Lives on the account's own document in the remote store, never locally.
/// Written for the first time by the first successful push, refreshed by
/// every push after that, and never deleted by the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncCursor {
    /// Instant of the last successful push
    pub last_sync: DateTime<Utc>,
}

impl SyncCursor {
    /// Cursor pointing at the current instant
    pub fn now() -> Self {
        Self {
            last_sync: Utc::now(),
        }
    }

    /// Cursor pointing at a given instant
    pub fn at(last_sync: DateTime<Utc>) -> Self {
        Self { last_sync }
    }
}
