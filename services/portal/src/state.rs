//! services/portal/src/state.rs
//!
//! Defines the application's shared state, built once at startup.

use crate::adapters::{FileTokenStorage, ReqwestTransport};
use crate::api::PortalApi;
use crate::cache::{CacheConfig, QueryCache};
use crate::config::Config;
use crate::controllers::AuthController;
use crate::error::PortalError;
use crate::store::{SessionStore, UiStore};
use course_portal_core::ports::{HttpTransport, TokenStorage};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

//=========================================================================================
// AppState
//=========================================================================================

/// The process-wide stores and the API they share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub session: Arc<SessionStore>,
    pub ui: Arc<UiStore>,
    pub api: PortalApi,
}

impl AppState {
    /// Wires the reqwest transport and file token storage from `config`.
    pub fn from_config(config: Config) -> Result<Self, PortalError> {
        let transport = Arc::new(ReqwestTransport::new(
            config.api_url.clone(),
            config.api_timeout,
        )?);
        let storage = Arc::new(FileTokenStorage::new(config.token_path.clone()));
        Ok(Self::with_ports(config, transport, storage))
    }

    /// Builds the state around caller-supplied ports.
    pub fn with_ports(
        config: Config,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        let session = Arc::new(SessionStore::restore(storage));
        let cache = QueryCache::new(CacheConfig {
            keep_unused_for: config.cache_retention,
            refetch_on_focus: config.refetch_on_focus,
            refetch_on_reconnect: config.refetch_on_reconnect,
        });
        let api = PortalApi::new(transport, session.clone(), cache);
        info!("{} client ready against {}", config.app_name, config.api_url);
        Self {
            config: Arc::new(config),
            session,
            ui: Arc::new(UiStore::new()),
            api,
        }
    }

    pub fn auth(&self) -> AuthController {
        AuthController::new(
            self.api.clone(),
            self.ui.clone(),
            self.config.notification_timeout,
        )
    }

    /// Starts periodic cache eviction at a quarter of the retention window.
    pub fn spawn_cache_sweeper(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let period = (self.config.cache_retention / 4).max(Duration::from_secs(1));
        self.api.cache().spawn_sweeper(period, cancel)
    }
}
