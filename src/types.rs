//! Application state shared by the HTTP handlers.

use std::sync::Arc;

use crate::{
    auth::AuthState, config::Config, docker::ContainerEngine, services::UpdateOrchestrator,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: AuthState,
    /// Holds the engine handle; every request reads container state fresh through it
    pub orchestrator: Arc<UpdateOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, engine: Arc<dyn ContainerEngine>) -> Self {
        let orchestrator = UpdateOrchestrator::new(
            engine,
            config.update.stop_grace(),
            config.update.parallelism,
        );
        Self {
            auth: AuthState::new(config.authorization.clone()),
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }
}
