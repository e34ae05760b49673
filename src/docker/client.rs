use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::Docker;
use std::time::Duration;
use tracing::{error, info};

use super::{ContainerEngine, ContainerManager, ImageManager, NetworkManager};
use crate::config::RegistryCredentials;
use crate::error::EngineError;
use crate::models::{ContainerConfigSnapshot, EndpointRequest, ImageReference, RunningContainer};

/// Docker client wrapper for managing Docker daemon connections
#[derive(Clone)]
pub struct DockerClient {
    client: Docker,
    credentials: Option<DockerCredentials>,
}

impl DockerClient {
    /// Connect to the daemon and verify it answers. Registry credentials, when given,
    /// are attached to every image pull.
    pub async fn new(
        socket_path: &str,
        registry: Option<&RegistryCredentials>,
    ) -> anyhow::Result<Self> {
        // Image pulls can take a long time on slow registries
        let timeout_seconds = 600;

        let client = if socket_path.starts_with("unix://") {
            Docker::connect_with_socket(socket_path, timeout_seconds, bollard::API_DEFAULT_VERSION)?
        } else {
            Docker::connect_with_unix(socket_path, timeout_seconds, bollard::API_DEFAULT_VERSION)?
        };

        match client.ping().await {
            Ok(_) => info!("Successfully connected to Docker daemon"),
            Err(e) => {
                error!("Failed to connect to Docker daemon: {}", e);
                return Err(e.into());
            }
        }

        let credentials = registry.map(|r| {
            info!("Using credentials for registry {} as {}", r.server_address, r.username);
            DockerCredentials {
                username: Some(r.username.clone()),
                password: Some(r.password.clone()),
                serveraddress: Some(r.server_address.clone()),
                ..Default::default()
            }
        });

        Ok(Self {
            client,
            credentials,
        })
    }
}

#[async_trait]
impl ContainerEngine for DockerClient {
    async fn pull_image(&self, image: &ImageReference) -> Result<(), EngineError> {
        ImageManager::from_ref(&self.client)
            .pull(image, self.credentials.clone())
            .await
    }

    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>, EngineError> {
        ContainerManager::from_ref(&self.client).list_running().await
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerConfigSnapshot, EngineError> {
        ContainerManager::from_ref(&self.client).snapshot(id).await
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), EngineError> {
        ContainerManager::from_ref(&self.client).stop(id, grace).await
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        ContainerManager::from_ref(&self.client).remove(id).await
    }

    async fn create_container(&self, snapshot: &ContainerConfigSnapshot) -> Result<String, EngineError> {
        ContainerManager::from_ref(&self.client).create(snapshot).await
    }

    async fn inspect_network(&self, name: &str) -> Result<String, EngineError> {
        NetworkManager::from_ref(&self.client).resolve(name).await
    }

    async fn connect_network(
        &self,
        network: &str,
        container_id: &str,
        endpoint: &EndpointRequest,
    ) -> Result<(), EngineError> {
        NetworkManager::from_ref(&self.client)
            .connect(network, container_id, endpoint)
            .await
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        ContainerManager::from_ref(&self.client).start(id).await
    }
}
