//! Firestore REST client
//!
//! Implements [`RemoteStore`] against the Cloud Firestore v1 REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use super::auth::FirebaseAuth;
use super::codec::{from_firestore_fields, to_firestore_fields};
use super::traits::{DocumentWrite, RemoteDocument, RemoteStore, MAX_BATCH_SIZE};
use crate::models::{RecordKind, SyncCursor};

/// Error indicating the Firestore API is not provisioned for the project
///
/// Surfaced by [`RemoteStore::probe`] when the project exists but the
/// Firestore API has never been enabled, so the availability layer can tell
/// "not set up" apart from ordinary connectivity failures.
#[derive(Debug, thiserror::Error)]
#[error("Cloud Firestore API is not enabled for this project")]
pub struct ServiceDisabledError;

/// Firestore REST client scoped to one Firebase project
pub struct FirestoreClient {
    auth: FirebaseAuth,
    project_id: String,
}

/// Document listing response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    documents: Option<Vec<FirestoreDocument>>,
    next_page_token: Option<String>,
}

/// A single document as the REST API returns it
#[derive(Debug, Deserialize)]
struct FirestoreDocument {
    name: String,
    fields: Option<Value>,
}

impl FirestoreClient {
    /// Firestore API base URL
    const BASE_URL: &'static str = "https://firestore.googleapis.com/v1";

    /// Documents fetched per listing page
    const PAGE_SIZE: usize = 300;

    /// Cursor field on the account document
    const CURSOR_FIELD: &'static str = "last_sync";

    /// Create a new client for a project
    pub fn new(auth: FirebaseAuth, project_id: impl Into<String>) -> Self {
        Self {
            auth,
            project_id: project_id.into(),
        }
    }

    /// Resource prefix `projects/{p}/databases/(default)/documents`
    fn documents_root(&self) -> String {
        format!(
            "projects/{}/databases/(default)/documents",
            self.project_id
        )
    }

    /// Full resource name of an account document
    fn account_doc(&self, account_id: &str) -> String {
        format!("{}/accounts/{}", self.documents_root(), account_id)
    }

    /// Full resource name of a record document
    fn record_doc(&self, account_id: &str, kind: RecordKind, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.account_doc(account_id),
            kind.collection(),
            key
        )
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.auth.get_access_token()?))
    }

    /// Fetch one document by resource name, `None` on 404
    fn fetch_document(&self, name: &str) -> Result<Option<RemoteDocument>> {
        let url = format!("{}/{}", Self::BASE_URL, name);
        let response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call();

        match response {
            Ok(mut resp) => {
                let doc: FirestoreDocument = resp
                    .body_mut()
                    .read_json()
                    .context("Failed to parse document response")?;
                Ok(Some(remote_document(doc)?))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to fetch document: {}", e)),
        }
    }
}

/// Convert an API document into the trait's plain-JSON form
fn remote_document(doc: FirestoreDocument) -> Result<RemoteDocument> {
    let key = doc
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let fields = match doc.fields {
        Some(fields) => from_firestore_fields(&fields)
            .with_context(|| format!("Malformed document '{}'", key))?,
        None => serde_json::Map::new(),
    };
    Ok(RemoteDocument { key, fields })
}

impl RemoteStore for FirestoreClient {
    fn probe(&self) -> Result<()> {
        // Read a well-known document path. 404 still proves the database is
        // reachable and provisioned; 403 is the signature Firestore returns
        // when the API was never enabled for the project.
        let url = format!(
            "{}/{}/accounts/__sync_probe__",
            Self::BASE_URL,
            self.documents_root()
        );
        let response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call();

        match response {
            Ok(_) | Err(ureq::Error::StatusCode(404)) => Ok(()),
            Err(ureq::Error::StatusCode(403)) => Err(ServiceDisabledError.into()),
            Err(e) => Err(anyhow::anyhow!("Firestore unreachable: {}", e)),
        }
    }

    fn commit_batch(&self, account_id: &str, writes: Vec<DocumentWrite>) -> Result<()> {
        if writes.len() > MAX_BATCH_SIZE {
            bail!(
                "Batch of {} writes exceeds the {}-operation ceiling",
                writes.len(),
                MAX_BATCH_SIZE
            );
        }
        if writes.is_empty() {
            return Ok(());
        }

        let wire_writes: Vec<Value> = writes
            .iter()
            .map(|write| {
                json!({
                    "update": {
                        "name": self.record_doc(account_id, write.kind, &write.key),
                        "fields": to_firestore_fields(&write.fields),
                    }
                })
            })
            .collect();

        let url = format!("{}/{}:commit", Self::BASE_URL, self.documents_root());
        ureq::post(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(json!({ "writes": wire_writes }))
            .context("Failed to commit write batch")?;
        Ok(())
    }

    fn stream_collection(
        &self,
        account_id: &str,
        kind: RecordKind,
    ) -> Result<Vec<RemoteDocument>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/{}/{}?pageSize={}",
                Self::BASE_URL,
                self.account_doc(account_id),
                kind.collection(),
                Self::PAGE_SIZE
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
            }

            let mut response = ureq::get(&url)
                .header("Authorization", &self.bearer()?)
                .call()
                .with_context(|| format!("Failed to list {} documents", kind))?;

            let page: ListDocumentsResponse = response
                .body_mut()
                .read_json()
                .context("Failed to parse document list response")?;

            for doc in page.documents.unwrap_or_default() {
                documents.push(remote_document(doc)?);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    fn get_document(
        &self,
        account_id: &str,
        kind: RecordKind,
        key: &str,
    ) -> Result<Option<RemoteDocument>> {
        self.fetch_document(&self.record_doc(account_id, kind, key))
    }

    fn get_cursor(&self, account_id: &str) -> Result<Option<SyncCursor>> {
        let Some(doc) = self.fetch_document(&self.account_doc(account_id))? else {
            return Ok(None);
        };
        let Some(text) = doc.fields.get(Self::CURSOR_FIELD).and_then(Value::as_str) else {
            return Ok(None);
        };
        let last_sync = DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .with_context(|| format!("Malformed sync cursor '{}'", text))?;
        Ok(Some(SyncCursor::at(last_sync)))
    }

    fn set_cursor(&self, account_id: &str, cursor: &SyncCursor) -> Result<()> {
        // PATCH with an update mask merges the cursor field into the account
        // document without clobbering anything else stored on it.
        let url = format!(
            "{}/{}?updateMask.fieldPaths={}",
            Self::BASE_URL,
            self.account_doc(account_id),
            Self::CURSOR_FIELD
        );
        let timestamp = cursor
            .last_sync
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        ureq::patch(&url)
            .header("Authorization", &self.bearer()?)
            .send_json(json!({
                "fields": {
                    Self::CURSOR_FIELD: { "timestampValue": timestamp }
                }
            }))
            .context("Failed to update sync cursor")?;
        Ok(())
    }
}
