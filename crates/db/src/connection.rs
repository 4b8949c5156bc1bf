use std::sync::Arc;
use std::time::Duration;

use rolodex_core::config::{ConfigError, StoreBackend, StoreConfig};
use thiserror::Error;
use tracing::info;

use crate::repositories::CustomerRepository;
use crate::store::{DocumentStore, FirestoreStore, InMemoryStore, StoreError};

pub type SharedStore = Arc<dyn DocumentStore>;

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Builds the configured store backend. Firestore credentials are resolved
/// here, so a missing project or token surfaces as `ConnectError::Config`.
pub fn connect(config: &StoreConfig) -> Result<SharedStore, ConnectError> {
    match config.backend {
        StoreBackend::Memory => {
            info!(event_name = "store.connect", backend = "memory", "using in-memory store");
            Ok(Arc::new(InMemoryStore::new()))
        }
        StoreBackend::Firestore => {
            let credentials = config.credentials()?;
            let store = FirestoreStore::new(
                &config.base_url,
                credentials,
                Duration::from_secs(config.timeout_secs.max(1)),
            )?;
            info!(
                event_name = "store.connect",
                backend = "firestore",
                documents_url = %store.documents_url(),
                "using firestore store"
            );
            Ok(Arc::new(store))
        }
    }
}

/// Connects and scopes a customer repository to the configured collection.
pub fn customer_repository(config: &StoreConfig) -> Result<CustomerRepository, ConnectError> {
    Ok(CustomerRepository::new(connect(config)?, config.collection.clone()))
}
