//! Application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use clipreel_worker::{WorkerConfig, WorkerContext};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub worker: WorkerContext,
    /// Held while a scheduling pass runs; passes never overlap.
    pub pass_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(config: ApiConfig, worker: WorkerContext) -> Self {
        Self {
            config,
            worker,
            pass_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Load worker state from the environment.
    pub async fn from_env(
        config: ApiConfig,
        cancel_rx: tokio::sync::watch::Receiver<bool>,
    ) -> clipreel_worker::WorkerResult<Self> {
        let worker = WorkerContext::from_env(WorkerConfig::from_env(), cancel_rx).await?;
        Ok(Self::new(config, worker))
    }
}
