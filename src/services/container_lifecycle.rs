//! Container recreation - replace a running container with one built from a freshly
//! pulled image.
//!
//! The container name is the identity that survives the swap; the Docker container
//! id changes. Steps run strictly in order and each one needs the previous to have
//! succeeded:
//!
//! snapshot -> stop -> remove -> create -> reconnect networks -> start
//!
//! A failure before `remove` leaves the old container in place. A failure after it
//! leaves no container under that name until an operator steps in; nothing is rolled
//! back.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::NetworkReconciler;
use crate::docker::ContainerEngine;
use crate::error::{RecreateError, RecreateStage};
use crate::models::{
    short_id, ContainerConfigSnapshot, NetworkWarning, OutcomeStatus, RecreationOutcome,
    RunningContainer,
};

pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(30);

pub struct ContainerRecreator {
    engine: Arc<dyn ContainerEngine>,
    reconciler: NetworkReconciler,
    stop_grace: Duration,
}

impl ContainerRecreator {
    pub fn new(engine: Arc<dyn ContainerEngine>, stop_grace: Duration) -> Self {
        Self {
            reconciler: NetworkReconciler::new(engine.clone()),
            engine,
            stop_grace,
        }
    }

    /// Recreate one container. Never returns an error: failures become a failed outcome.
    pub async fn recreate(&self, container: &RunningContainer) -> RecreationOutcome {
        info!(
            "--- Processing container: {} (ID: {}) ---",
            container.name,
            container.short_id()
        );

        let mut warnings = Vec::new();
        match self.run(container, &mut warnings).await {
            Ok(new_id) => {
                info!("--- Successfully updated container '{}' ---", container.name);
                RecreationOutcome {
                    container_name: container.name.clone(),
                    status: OutcomeStatus::Succeeded,
                    stage: None,
                    detail: format!(
                        "Replaced {} with {}",
                        container.short_id(),
                        short_id(&new_id)
                    ),
                    new_container_id: Some(new_id),
                    warnings,
                }
            }
            Err(e) => {
                error!(
                    "Error updating container {} (ID: {}): {}",
                    container.name,
                    container.short_id(),
                    e
                );
                RecreationOutcome {
                    container_name: container.name.clone(),
                    status: OutcomeStatus::Failed,
                    stage: Some(e.stage),
                    new_container_id: None,
                    detail: e.to_string(),
                    warnings,
                }
            }
        }
    }

    async fn run(
        &self,
        container: &RunningContainer,
        warnings: &mut Vec<NetworkWarning>,
    ) -> Result<String, RecreateError> {
        let id = container.id.as_str();
        let name = container.name.as_str();

        // Read once, before anything destructive. The source is gone after `remove`.
        let snapshot: ContainerConfigSnapshot = self
            .engine
            .inspect_container(id)
            .await
            .map_err(RecreateError::at(RecreateStage::Snapshot))?;

        info!("Stopping old container '{}' (ID: {})...", name, short_id(id));
        self.engine
            .stop_container(id, self.stop_grace)
            .await
            .map_err(RecreateError::at(RecreateStage::Stop))?;

        info!("Removing old container '{}' (ID: {})...", name, short_id(id));
        match self.engine.remove_container(id).await {
            Ok(()) => {}
            // The daemon deletes auto-remove containers itself once they stop
            Err(e) if e.is_not_found() && snapshot.host.auto_remove => {
                info!("Old container '{}' was already removed on stop (auto-remove).", name);
            }
            Err(e) => return Err(RecreateError::at(RecreateStage::Remove)(e)),
        }

        info!("Creating new container '{}'...", snapshot.name);
        let new_id = self
            .engine
            .create_container(&snapshot)
            .await
            .map_err(RecreateError::at(RecreateStage::Create))?;
        info!("New container '{}' (ID: {}) created.", snapshot.name, short_id(&new_id));

        warnings.extend(
            self.reconciler
                .reconnect(&new_id, &snapshot.networks, snapshot.host.network_mode.as_deref())
                .await,
        );

        info!("Starting new container '{}' (ID: {})...", snapshot.name, short_id(&new_id));
        self.engine
            .start_container(&new_id)
            .await
            .map_err(RecreateError::at(RecreateStage::Start))?;

        Ok(new_id)
    }
}
