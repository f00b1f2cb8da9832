//! Shared in-process state: the session registry, the pending-rematch ledger
//! and the board logic.

pub mod board;
pub mod rematch;
pub mod sessions;

use std::sync::Arc;

use crate::{config::AppConfig, dao::store::DataStore};

use self::{rematch::RematchLedger, sessions::SessionRegistry};

/// Handle to the central application state, cloned into every handler.
pub type SharedState = Arc<AppState>;

/// Central application state storing live sessions, the rematch ledger and
/// the persistence handle.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn DataStore>,
    sessions: SessionRegistry,
    rematch: RematchLedger,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn DataStore>) -> SharedState {
        let sessions = SessionRegistry::new(config.session_capacity());
        Arc::new(Self {
            config,
            store,
            sessions,
            rematch: RematchLedger::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the persistence backend.
    pub fn store(&self) -> Arc<dyn DataStore> {
        self.store.clone()
    }

    /// Registry of signed-in sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Ledger of pending rematch requests.
    pub fn rematch(&self) -> &RematchLedger {
        &self.rematch
    }
}
