//! Container engine capability used by the update workflow.
//!
//! The workflow only talks to the engine through [`ContainerEngine`], so it can be
//! driven against the Docker daemon ([`DockerClient`](super::DockerClient)) or an
//! in-memory engine in tests.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::EngineError;
use crate::models::{ContainerConfigSnapshot, EndpointRequest, ImageReference, RunningContainer};

#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Pull `repository:tag` so later creates using that reference get the fresh content.
    async fn pull_image(&self, image: &ImageReference) -> Result<(), EngineError>;

    /// Running containers together with the tags of the image each one runs.
    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>, EngineError>;

    /// Read the full reproducible configuration of a container.
    async fn inspect_container(&self, id: &str) -> Result<ContainerConfigSnapshot, EngineError>;

    /// Stop gracefully, letting the engine force-kill after `grace`.
    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), EngineError>;

    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;

    /// Create a container named `snapshot.name` from the snapshot's process and host
    /// settings. Returns the new container id.
    async fn create_container(&self, snapshot: &ContainerConfigSnapshot) -> Result<String, EngineError>;

    /// Resolve a network by name. Returns its id, or `EngineError::NotFound`.
    async fn inspect_network(&self, name: &str) -> Result<String, EngineError>;

    async fn connect_network(
        &self,
        network: &str,
        container_id: &str,
        endpoint: &EndpointRequest,
    ) -> Result<(), EngineError>;

    async fn start_container(&self, id: &str) -> Result<(), EngineError>;
}
