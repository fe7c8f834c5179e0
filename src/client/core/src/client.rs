//! Wiring of the client components.

use std::sync::Arc;
use tracing::debug;

use crate::aggregate::Aggregator;
use crate::api::ApiClient;
use crate::config::VoyageConfig;
use crate::dashboard::DashboardLoader;
use crate::error::{ErrorCode, Result, VoyageError};
use crate::gate::AuthGate;
use crate::session::{FileStorage, SessionStorage, SessionStore};

/// Every client component, sharing one session store.
#[derive(Debug)]
pub struct VoyageClient {
    config: VoyageConfig,
    sessions: Arc<SessionStore>,
    api: ApiClient,
    aggregator: Aggregator,
    gate: AuthGate,
}

impl VoyageClient {
    /// Build the client, restoring the session from the configured file.
    pub fn from_config(config: VoyageConfig) -> Result<Self> {
        let path = config.session.resolve_storage_path().ok_or_else(|| {
            VoyageError::new(
                ErrorCode::ConfigurationError,
                "Could not determine where to store the session",
            )
        })?;
        debug!(path = %path.display(), "Using session file");
        Self::with_storage(config, Arc::new(FileStorage::new(path)))
    }

    /// Build the client over an explicit storage backend.
    pub fn with_storage(config: VoyageConfig, storage: Arc<dyn SessionStorage>) -> Result<Self> {
        let sessions = Arc::new(SessionStore::restore(storage)?);
        let api = ApiClient::new(&config.api, sessions.clone())?;
        let aggregator = Aggregator::new(&config.aggregator);
        let gate = AuthGate::for_client(&api, &config.gate);

        Ok(Self {
            config,
            sessions,
            api,
            aggregator,
            gate,
        })
    }

    pub fn config(&self) -> &VoyageConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn dashboards(&self) -> DashboardLoader {
        DashboardLoader::new(self.api.clone(), self.aggregator.clone())
    }
}
