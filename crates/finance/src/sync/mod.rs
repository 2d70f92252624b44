mod availability;
mod engine;

pub use availability::Availability;
pub use engine::{SyncResult, SyncService, SyncStats, SyncStatus};
