//! In-memory remote store implementation
//!
//! Used in tests as a stand-in for Firestore. Enforces the same batch-size
//! ceiling the real store does.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::sync::RwLock;

use super::traits::{DocumentWrite, RemoteDocument, RemoteStore, MAX_BATCH_SIZE};
use crate::models::{RecordKind, SyncCursor};

type DocKey = (String, RecordKind, String);

/// In-memory implementation of [`RemoteStore`]
pub struct InMemoryRemoteStore {
    documents: RwLock<HashMap<DocKey, serde_json::Map<String, serde_json::Value>>>,
    cursors: RwLock<HashMap<String, SyncCursor>>,
}

impl InMemoryRemoteStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            cursors: RwLock::new(HashMap::new()),
        }
    }

    /// Number of documents in one account's kind-collection
    pub fn count_documents(&self, account_id: &str, kind: RecordKind) -> usize {
        self.documents
            .read()
            .unwrap()
            .keys()
            .filter(|(a, k, _)| a == account_id && *k == kind)
            .count()
    }

    /// Store a document directly (test seeding)
    pub fn put_document(
        &self,
        account_id: &str,
        kind: RecordKind,
        key: &str,
        fields: serde_json::Map<String, serde_json::Value>,
    ) {
        self.documents
            .write()
            .unwrap()
            .insert((account_id.to_string(), kind, key.to_string()), fields);
    }
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteStore for InMemoryRemoteStore {
    fn probe(&self) -> Result<()> {
        Ok(())
    }

    fn commit_batch(&self, account_id: &str, writes: Vec<DocumentWrite>) -> Result<()> {
        if writes.len() > MAX_BATCH_SIZE {
            bail!(
                "Batch of {} writes exceeds the {}-operation ceiling",
                writes.len(),
                MAX_BATCH_SIZE
            );
        }
        let mut documents = self.documents.write().unwrap();
        for write in writes {
            documents.insert((account_id.to_string(), write.kind, write.key), write.fields);
        }
        Ok(())
    }

    fn stream_collection(
        &self,
        account_id: &str,
        kind: RecordKind,
    ) -> Result<Vec<RemoteDocument>> {
        let documents = self.documents.read().unwrap();
        let mut docs: Vec<RemoteDocument> = documents
            .iter()
            .filter(|((a, k, _), _)| a == account_id && *k == kind)
            .map(|((_, _, key), fields)| RemoteDocument {
                key: key.clone(),
                fields: fields.clone(),
            })
            .collect();
        docs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(docs)
    }

    fn get_document(
        &self,
        account_id: &str,
        kind: RecordKind,
        key: &str,
    ) -> Result<Option<RemoteDocument>> {
        let documents = self.documents.read().unwrap();
        Ok(documents
            .get(&(account_id.to_string(), kind, key.to_string()))
            .map(|fields| RemoteDocument {
                key: key.to_string(),
                fields: fields.clone(),
            }))
    }

    fn get_cursor(&self, account_id: &str) -> Result<Option<SyncCursor>> {
        Ok(self.cursors.read().unwrap().get(account_id).copied())
    }

    fn set_cursor(&self, account_id: &str, cursor: &SyncCursor) -> Result<()> {
        self.cursors
            .write()
            .unwrap()
            .insert(account_id.to_string(), *cursor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(note: &str) -> serde_json::Map<String, serde_json::Value> {
        json!({ "note": note }).as_object().unwrap().clone()
    }

    #[test]
    fn test_commit_overwrites_same_key() {
        let store = InMemoryRemoteStore::new();
        let write = |note: &str| DocumentWrite {
            kind: RecordKind::LedgerEntry,
            key: "1".to_string(),
            fields: fields(note),
        };
        store.commit_batch("a", vec![write("first")]).unwrap();
        store.commit_batch("a", vec![write("second")]).unwrap();

        assert_eq!(store.count_documents("a", RecordKind::LedgerEntry), 1);
        let doc = store
            .get_document("a", RecordKind::LedgerEntry, "1")
            .unwrap()
            .unwrap();
        assert_eq!(doc.fields["note"], json!("second"));
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let store = InMemoryRemoteStore::new();
        let writes: Vec<DocumentWrite> = (0..=MAX_BATCH_SIZE)
            .map(|i| DocumentWrite {
                kind: RecordKind::LedgerEntry,
                key: i.to_string(),
                fields: fields("x"),
            })
            .collect();
        assert!(store.commit_batch("a", writes).is_err());
    }

    #[test]
    fn test_cursor_roundtrip() {
        let store = InMemoryRemoteStore::new();
        assert!(store.get_cursor("a").unwrap().is_none());
        let cursor = SyncCursor::now();
        store.set_cursor("a", &cursor).unwrap();
        assert_eq!(store.get_cursor("a").unwrap(), Some(cursor));
    }
}
