//! Synchronizable record kinds

use std::fmt;

/// The three record kinds that participate in cloud sync
///
/// The variant order here is the fixed order in which push processes kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Ledger entries (income and expenses)
    LedgerEntry,
    /// Per-category spending limits
    SpendingLimit,
    /// Per-account preference settings (singleton)
    Preferences,
}

impl RecordKind {
    /// Remote collection name under `accounts/{account_id}/`
    pub fn collection(self) -> &'static str {
        match self {
            RecordKind::LedgerEntry => "ledger_entries",
            RecordKind::SpendingLimit => "spending_limits",
            RecordKind::Preferences => "settings",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_names() {
        assert_eq!(RecordKind::LedgerEntry.collection(), "ledger_entries");
        assert_eq!(RecordKind::SpendingLimit.collection(), "spending_limits");
        assert_eq!(RecordKind::Preferences.collection(), "settings");
    }
}
