use std::sync::Arc;

use axum::Router;
use rolodex_core::config::{AppConfig, ConfigError, LoadOptions};
use rolodex_db::{customer_repository, ConnectError};
use thiserror::Error;
use tracing::{info, warn};

use crate::address::HttpAddressLookup;
use crate::rpc::{Dispatcher, RepositorySlot};
use crate::{health, rpc};

pub struct Application {
    pub config: AppConfig,
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("address lookup client could not be built: {0}")]
    AddressClient(#[source] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    bootstrap_with_config(AppConfig::load(options)?)
}

/// Wires the dispatcher from an already loaded config. A store that cannot be
/// configured does not stop startup; customer calls report it instead.
pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let customers: RepositorySlot = match customer_repository(&config.store) {
        Ok(repository) => {
            info!(
                event_name = "system.bootstrap.store_ready",
                correlation_id = "bootstrap",
                collection = %repository.collection(),
                "customer repository initialized"
            );
            Ok(Arc::new(repository))
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.store_unconfigured",
                correlation_id = "bootstrap",
                error = %error,
                "customer repository unavailable; customer calls will fail"
            );
            Err(configuration_message(error))
        }
    };

    let address = HttpAddressLookup::new(&config.geocoding).map_err(BootstrapError::AddressClient)?;
    if !address.has_api_key() {
        info!(
            event_name = "system.bootstrap.geocoding_disabled",
            correlation_id = "bootstrap",
            "geocoding api key not set; reverse zip lookups will find nothing"
        );
    }

    Ok(Application { config, dispatcher: Arc::new(Dispatcher::new(customers, Arc::new(address))) })
}

impl Application {
    pub fn router(&self) -> Router {
        rpc::router(self.dispatcher.clone())
            .merge(health::router(self.dispatcher.customers().clone()))
    }
}

fn configuration_message(error: ConnectError) -> String {
    match error {
        ConnectError::Config(error) => error.to_string(),
        ConnectError::Store(error) => format!("store client could not be built: {error}"),
    }
}
