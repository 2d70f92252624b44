//! Per-account preference settings

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::document;

/// Fixed remote document key for the preferences singleton
pub const PREFERENCES_KEY: &str = "preferences";

/// Display and locale preferences for one account
///
/// A singleton: at most one row per account, keyed by the account itself
/// rather than an integer id. The remote document key is the fixed string
/// [`PREFERENCES_KEY`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSettings {
    /// Owning account
    pub account_id: String,
    /// Display theme: "light", "dark" or "auto"
    pub theme: String,
    /// ISO 4217 currency code
    pub currency: String,
    /// Date display format, e.g. "MM/DD/YYYY"
    pub date_format: String,
    /// ISO 639-1 language code
    pub language: String,
}

impl PreferenceSettings {
    /// Create settings with the application defaults
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            theme: "auto".to_string(),
            currency: "USD".to_string(),
            date_format: "MM/DD/YYYY".to_string(),
            language: "en".to_string(),
        }
    }

    /// Set the display theme
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    /// Set the currency code
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Build the remote document payload
    pub fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("theme".into(), json!(self.theme));
        doc.insert("currency".into(), json!(self.currency));
        doc.insert("date_format".into(), json!(self.date_format));
        doc.insert("language".into(), json!(self.language));
        doc
    }

    /// Reconstruct settings from a remote document, defaulting absent fields
    pub fn from_document(account_id: impl Into<String>, doc: &Map<String, Value>) -> Result<Self> {
        let defaults = Self::new(account_id);
        Ok(Self {
            theme: document::get_opt_str(doc, "theme").unwrap_or(defaults.theme),
            currency: document::get_opt_str(doc, "currency").unwrap_or(defaults.currency),
            date_format: document::get_opt_str(doc, "date_format").unwrap_or(defaults.date_format),
            language: document::get_opt_str(doc, "language").unwrap_or(defaults.language),
            account_id: defaults.account_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = PreferenceSettings::new("acct-1");
        assert_eq!(prefs.theme, "auto");
        assert_eq!(prefs.currency, "USD");
        assert_eq!(prefs.date_format, "MM/DD/YYYY");
        assert_eq!(prefs.language, "en");
    }

    #[test]
    fn test_document_roundtrip() {
        let original = PreferenceSettings::new("acct-1")
            .with_theme("dark")
            .with_currency("EUR");
        let doc = original.to_document();
        let restored = PreferenceSettings::from_document("acct-1", &doc).unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_sparse_document_uses_defaults() {
        let doc = serde_json::json!({ "theme": "light" })
            .as_object()
            .unwrap()
            .clone();
        let restored = PreferenceSettings::from_document("acct-1", &doc).unwrap();
        assert_eq!(restored.theme, "light");
        assert_eq!(restored.currency, "USD");
    }
}
