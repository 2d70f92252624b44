//! Remote availability probe
//!
//! Evaluated once when the sync service is constructed; every subsequent
//! operation consults the cached value instead of re-probing the network.

use log::{info, warn};

use crate::remote::{RemoteStore, ServiceDisabledError};

/// Cached result of the one-time remote store probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Remote store reachable and provisioned
    Available,
    /// The project exists but the Firestore API was never enabled
    ServiceDisabled,
    /// Network failure, bad credentials, or anything else
    Unreachable,
}

impl Availability {
    /// Probe the remote store once and classify the outcome
    ///
    /// Never fails and never retries; an unavailable remote downgrades sync
    /// to a disabled state instead of crashing the process.
    pub fn probe(remote: &dyn RemoteStore) -> Self {
        match remote.probe() {
            Ok(()) => {
                info!("Remote store reachable - cloud sync enabled");
                Availability::Available
            }
            Err(e) if e.is::<ServiceDisabledError>() => {
                warn!("Cloud Firestore API is not enabled - cloud sync disabled");
                info!("To enable cloud sync:");
                info!("  1. Open https://console.developers.google.com/apis/api/firestore.googleapis.com/overview for your project");
                info!("  2. Click 'Enable API'");
                info!("  3. In the Firebase console, create a Firestore database");
                info!("  4. Wait a minute or two and restart the app");
                Availability::ServiceDisabled
            }
            Err(e) => {
                warn!("Remote store not reachable - cloud sync disabled: {:#}", e);
                Availability::Unreachable
            }
        }
    }

    /// Whether sync operations may contact the remote store
    pub fn is_available(self) -> bool {
        self == Availability::Available
    }
}
