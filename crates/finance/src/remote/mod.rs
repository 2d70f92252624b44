//! Remote document store: traits, Firestore client, in-memory test double

mod auth;
pub mod codec;
mod firestore;
mod memory;
mod traits;

pub use auth::FirebaseAuth;
pub use firestore::{FirestoreClient, ServiceDisabledError};
pub use memory::InMemoryRemoteStore;
pub use traits::{DocumentWrite, RemoteDocument, RemoteStore, MAX_BATCH_SIZE};
