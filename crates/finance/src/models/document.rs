//! Field accessors for remote document payloads
//!
//! Remote documents are plain JSON maps. These helpers pull typed fields out
//! of a payload and turn a missing or mistyped field into an error, so a
//! malformed document aborts the pull instead of inserting garbage rows.

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use super::Money;

pub(crate) fn require<'a>(doc: &'a Map<String, Value>, field: &str) -> Result<&'a Value> {
    doc.get(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| anyhow!("Document missing required field '{}'", field))
}

pub(crate) fn get_str(doc: &Map<String, Value>, field: &str) -> Result<String> {
    require(doc, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Document field '{}' is not a string", field))
}

pub(crate) fn get_opt_str(doc: &Map<String, Value>, field: &str) -> Option<String> {
    doc.get(field).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn get_opt_i64(doc: &Map<String, Value>, field: &str) -> Option<i64> {
    doc.get(field).and_then(Value::as_i64)
}

pub(crate) fn get_bool_or(doc: &Map<String, Value>, field: &str, default: bool) -> bool {
    doc.get(field).and_then(Value::as_bool).unwrap_or(default)
}

pub(crate) fn get_money(doc: &Map<String, Value>, field: &str) -> Result<Money> {
    let value = require(doc, field)?
        .as_f64()
        .ok_or_else(|| anyhow!("Document field '{}' is not a number", field))?;
    Money::from_decimal(value)
}

pub(crate) fn get_date(doc: &Map<String, Value>, field: &str) -> Result<NaiveDate> {
    let text = get_str(doc, field)?;
    text.parse::<NaiveDate>()
        .map_err(|e| anyhow!("Document field '{}' is not an ISO date: {}", field, e))
}

/// Parse an optional RFC 3339 instant, falling back to `now` when absent.
///
/// Documents written by older clients may omit timestamps; the original
/// behavior is to let the local row pick up fresh ones.
pub(crate) fn get_instant_or_now(doc: &Map<String, Value>, field: &str) -> Result<DateTime<Utc>> {
    match doc.get(field).and_then(Value::as_str) {
        Some(text) => DateTime::parse_from_rfc3339(text)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| anyhow!("Document field '{}' is not an ISO instant: {}", field, e)),
        None => Ok(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_missing_field() {
        let d = doc(json!({ "other": 1 }));
        assert!(get_str(&d, "amount").is_err());
    }

    #[test]
    fn test_null_counts_as_missing() {
        let d = doc(json!({ "amount": null }));
        assert!(get_money(&d, "amount").is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let d = doc(json!({
            "amount": 12.5,
            "note": "coffee",
            "category_id": 3,
            "active": false,
            "date": "2025-06-01",
        }));
        assert_eq!(get_money(&d, "amount").unwrap().cents(), 1250);
        assert_eq!(get_opt_str(&d, "note").as_deref(), Some("coffee"));
        assert_eq!(get_opt_i64(&d, "category_id"), Some(3));
        assert!(!get_bool_or(&d, "active", true));
        assert_eq!(
            get_date(&d, "date").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        );
    }

    #[test]
    fn test_instant_fallback() {
        let d = doc(json!({}));
        // Absent is fine, garbage is not
        assert!(get_instant_or_now(&d, "created_at").is_ok());
        let bad = doc(json!({ "created_at": "yesterday" }));
        assert!(get_instant_or_now(&bad, "created_at").is_err());
    }
}
