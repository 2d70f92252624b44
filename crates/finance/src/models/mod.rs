//! Domain models for synchronizable finance records

mod document;
mod kind;
mod ledger_entry;
mod money;
mod preferences;
mod spending_limit;
mod sync_cursor;

pub use kind::RecordKind;
pub use ledger_entry::{Direction, LedgerEntry};
pub use money::Money;
pub use preferences::{PreferenceSettings, PREFERENCES_KEY};
pub use spending_limit::{LimitPeriod, SpendingLimit};
pub use sync_cursor::SyncCursor;
