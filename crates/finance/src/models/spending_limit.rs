//! Spending limit model (per-category budget ceilings)

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::document;
use super::Money;

/// Budgeting period covered by a spending limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitPeriod {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl LimitPeriod {
    /// Wire/database representation
    pub fn as_str(self) -> &'static str {
        match self {
            LimitPeriod::Daily => "daily",
            LimitPeriod::Weekly => "weekly",
            LimitPeriod::Monthly => "monthly",
            LimitPeriod::Yearly => "yearly",
        }
    }

    /// Parse the wire/database representation
    pub fn parse(text: &str) -> Result<Self> {
        match text {
            "daily" => Ok(LimitPeriod::Daily),
            "weekly" => Ok(LimitPeriod::Weekly),
            "monthly" => Ok(LimitPeriod::Monthly),
            "yearly" => Ok(LimitPeriod::Yearly),
            other => anyhow::bail!("Unknown limit period '{}'", other),
        }
    }
}

/// A spending ceiling for one category over one period
///
/// Limits have no soft-delete flag and are always eligible for sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingLimit {
    /// Local integer identity (database primary key)
    pub id: i64,
    /// Owning account
    pub account_id: String,
    /// Category the limit applies to
    pub category_id: i64,
    /// Monetary ceiling for the period
    pub ceiling: Money,
    /// Period kind
    pub period: LimitPeriod,
    /// Inclusive start of the limit's validity
    pub start_date: NaiveDate,
    /// Inclusive end of the limit's validity
    pub end_date: NaiveDate,
    /// Whether the limit is currently enforced
    pub is_active: bool,
}

impl SpendingLimit {
    /// Create a new active limit
    pub fn new(
        id: i64,
        account_id: impl Into<String>,
        category_id: i64,
        ceiling: Money,
        period: LimitPeriod,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            account_id: account_id.into(),
            category_id,
            ceiling,
            period,
            start_date,
            end_date,
            is_active: true,
        }
    }

    /// Set the active flag
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Build the remote document payload (everything but the local id)
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("category_id".into(), json!(self.category_id));
        doc.insert("ceiling".into(), json!(self.ceiling.to_decimal()));
        doc.insert("period".into(), json!(self.period.as_str()));
        doc.insert("start_date".into(), json!(self.start_date.to_string()));
        doc.insert("end_date".into(), json!(self.end_date.to_string()));
        doc.insert("is_active".into(), json!(self.is_active));
        doc
    }

    /// Reconstruct a local row from a remote document
    pub fn from_document(
        id: i64,
        account_id: impl Into<String>,
        doc: &Map<String, Value>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            account_id: account_id.into(),
            category_id: document::require(doc, "category_id")?
                .as_i64()
                .ok_or_else(|| anyhow::anyhow!("Document field 'category_id' is not an integer"))?,
            ceiling: document::get_money(doc, "ceiling")?,
            period: LimitPeriod::parse(&document::get_str(doc, "period")?)?,
            start_date: document::get_date(doc, "start_date")?,
            end_date: document::get_date(doc, "end_date")?,
            is_active: document::get_bool_or(doc, "is_active", true),
        })
    }
}
