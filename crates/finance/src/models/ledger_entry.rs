//! Ledger entry model (income and expense records)

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::document;
use super::Money;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money coming in
    Inflow,
    /// Money going out
    Outflow,
}

impl Direction {
    /// Wire/database representation
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inflow => "inflow",
            Direction::Outflow => "outflow",
        }
    }

    /// Parse the wire/database representation
    pub fn parse(text: &str) -> Result<Self> {
        match text {
            "inflow" => Ok(Direction::Inflow),
            "outflow" => Ok(Direction::Outflow),
            other => anyhow::bail!("Unknown entry direction '{}'", other),
        }
    }
}

/// A single financial transaction in an account's ledger
///
/// The locally assigned integer id is stable for the lifetime of the record
/// and doubles as the remote document key, which is what makes repeated
/// pushes idempotent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Local integer identity (database primary key)
    pub id: i64,
    /// Owning account
    pub account_id: String,
    /// Amount, always non-negative; direction carries the sign
    pub amount: Money,
    /// Inflow or outflow
    pub direction: Direction,
    /// Optional category reference
    pub category_id: Option<i64>,
    /// Free-text note
    pub note: Option<String>,
    /// Effective date of the transaction
    pub date: NaiveDate,
    /// When the row was created
    pub created_at: DateTime<Utc>,
    /// When the row was last modified
    pub updated_at: DateTime<Utc>,
    /// Soft-delete flag; deleted entries never sync
    pub is_deleted: bool,
}

impl LedgerEntry {
    /// Create a new entry
    pub fn new(
        id: i64,
        account_id: impl Into<String>,
        amount: Money,
        direction: Direction,
        date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            account_id: account_id.into(),
            amount,
            direction,
            category_id: None,
            note: None,
            date,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        }
    }

    /// Set the category reference
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    /// Set the free-text note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Mark the entry soft-deleted
    pub fn deleted(mut self) -> Self {
        self.is_deleted = true;
        self
    }

    /// Build the remote document payload
    ///
    /// Everything except the local id (which becomes the document key) and
    /// the soft-delete flag (deleted entries are never pushed). Dates are
    /// ISO-8601 text, the amount a plain decimal number.
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("amount".into(), json!(self.amount.to_decimal()));
        doc.insert("direction".into(), json!(self.direction.as_str()));
        doc.insert("category_id".into(), json!(self.category_id));
        doc.insert("note".into(), json!(self.note));
        doc.insert("date".into(), json!(self.date.to_string()));
        doc.insert("created_at".into(), json!(self.created_at.to_rfc3339()));
        doc.insert("updated_at".into(), json!(self.updated_at.to_rfc3339()));
        doc
    }

    /// Reconstruct a local row from a remote document
    ///
    /// Rows created this way are always marked not-deleted. Fails if a
    /// required field is missing or mistyped.
    pub fn from_document(
        id: i64,
        account_id: impl Into<String>,
        doc: &Map<String, Value>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            account_id: account_id.into(),
            amount: document::get_money(doc, "amount")?,
            direction: Direction::parse(&document::get_str(doc, "direction")?)?,
            category_id: document::get_opt_i64(doc, "category_id"),
            note: document::get_opt_str(doc, "note"),
            date: document::get_date(doc, "date")?,
            created_at: document::get_instant_or_now(doc, "created_at")?,
            updated_at: document::get_instant_or_now(doc, "updated_at")?,
            is_deleted: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> LedgerEntry {
        LedgerEntry::new(
            7,
            "acct-1",
            Money::from_cents(1250),
            Direction::Outflow,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
        .with_category(3)
        .with_note("coffee")
    }

    #[test]
    fn test_document_excludes_identity_and_delete_flag() {
        let doc = entry().to_document();
        assert!(!doc.contains_key("id"));
        assert!(!doc.contains_key("is_deleted"));
        assert!(!doc.contains_key("account_id"));
        assert_eq!(doc["amount"], serde_json::json!(12.5));
        assert_eq!(doc["direction"], serde_json::json!("outflow"));
        assert_eq!(doc["date"], serde_json::json!("2025-06-01"));
    }

    #[test]
    fn test_document_roundtrip() {
        let original = entry();
        let doc = original.to_document();
        let restored = LedgerEntry::from_document(7, "acct-1", &doc).unwrap();
        assert_eq!(restored.amount, original.amount);
        assert_eq!(restored.direction, original.direction);
        assert_eq!(restored.category_id, original.category_id);
        assert_eq!(restored.note, original.note);
        assert_eq!(restored.date, original.date);
        assert!(!restored.is_deleted);
    }

    #[test]
    fn test_from_document_missing_amount() {
        let mut doc = entry().to_document();
        doc.remove("amount");
        assert!(LedgerEntry::from_document(7, "acct-1", &doc).is_err());
    }

    #[test]
    fn test_from_document_bad_direction() {
        let mut doc = entry().to_document();
        doc.insert("direction".into(), serde_json::json!("sideways"));
        assert!(LedgerEntry::from_document(7, "acct-1", &doc).is_err());
    }

    #[test]
    fn test_pulled_deleted_entry_revives_as_active() {
        // A document pushed before the local row was soft-deleted still
        // reconstructs as a live row; pull never carries delete state.
        let doc = entry().deleted().to_document();
        let restored = LedgerEntry::from_document(7, "acct-1", &doc).unwrap();
        assert!(!restored.is_deleted);
    }
}
