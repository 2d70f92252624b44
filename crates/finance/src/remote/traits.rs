//! Remote document store trait definitions

use anyhow::Result;
use serde_json::{Map, Value};

use crate::models::{RecordKind, SyncCursor};

/// Maximum number of writes the remote store accepts per batch commit
///
/// Firestore's own API ceiling; the sync engine chunks staged writes to
/// stay under it.
pub const MAX_BATCH_SIZE: usize = 500;

/// One staged document write, addressed `accounts/{account_id}/{kind}/{key}`
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    /// Which kind-collection the document lives in
    pub kind: RecordKind,
    /// Document key within the collection (local id, or "preferences")
    pub key: String,
    /// Plain JSON payload
    pub fields: Map<String, Value>,
}

/// A document read back from the remote store
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Document key within its collection
    pub key: String,
    /// Plain JSON payload
    pub fields: Map<String, Value>,
}

/// Trait for the remote document-oriented replica
///
/// Documents are addressed hierarchically by account id, record kind and
/// document key. Writes are batched; reads stream a whole kind-collection.
/// The per-account sync cursor lives on the account document itself.
pub trait RemoteStore: Send + Sync {
    /// Cheap reachability/provisioning check, run once at service startup
    ///
    /// A provisioning failure surfaces as
    /// [`ServiceDisabledError`](super::ServiceDisabledError) so the caller
    /// can tell "not enabled" from "network down".
    fn probe(&self) -> Result<()>;

    /// Commit a batch of at most [`MAX_BATCH_SIZE`] document writes
    ///
    /// Each write overwrites the document at its path, which is what makes
    /// repeated pushes idempotent.
    fn commit_batch(&self, account_id: &str, writes: Vec<DocumentWrite>) -> Result<()>;

    /// Read every document in one account's kind-collection
    fn stream_collection(&self, account_id: &str, kind: RecordKind)
        -> Result<Vec<RemoteDocument>>;

    /// Read a single document, `None` if absent
    fn get_document(
        &self,
        account_id: &str,
        kind: RecordKind,
        key: &str,
    ) -> Result<Option<RemoteDocument>>;

    /// Read the account's sync cursor, `None` if no push ever succeeded
    fn get_cursor(&self, account_id: &str) -> Result<Option<SyncCursor>>;

    /// Merge-set the account's sync cursor
    fn set_cursor(&self, account_id: &str, cursor: &SyncCursor) -> Result<()>;
}
