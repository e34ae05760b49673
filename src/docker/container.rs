use bollard::{
    container::{
        CreateContainerOptions, InspectContainerOptions, ListContainersOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
    },
    Docker,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::snapshot::{create_config, snapshot_from_inspect};
use super::ImageManager;
use crate::error::EngineError;
use crate::models::{short_id, ContainerConfigSnapshot, RunningContainer};

/// Extra time allowed on top of the stop grace period before the client gives up
const STOP_SLACK: Duration = Duration::from_secs(10);

/// Container management operations
pub struct ContainerManager {
    client: Docker,
}

impl ContainerManager {
    /// Create from a reference (clones the Docker client)
    pub fn from_ref(client: &Docker) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// List running containers and resolve the tags of the image each one runs
    pub async fn list_running(&self) -> Result<Vec<RunningContainer>, EngineError> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let containers = self.client.list_containers(Some(options)).await?;

        let images = ImageManager::from_ref(&self.client);
        let mut tags_by_image: HashMap<String, Vec<String>> = HashMap::new();
        let mut result = Vec::with_capacity(containers.len());

        for container in containers {
            let Some(id) = container.id else { continue };
            let name = container
                .names
                .and_then(|names| names.into_iter().next())
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| short_id(&id).to_string());

            let image_tags = match container.image_id {
                Some(image_id) => {
                    if let Some(tags) = tags_by_image.get(&image_id) {
                        tags.clone()
                    } else {
                        let tags = match images.tags(&image_id).await {
                            Ok(tags) => tags,
                            Err(e) => {
                                warn!("Could not resolve image tags for container {} ({}): {}", name, short_id(&id), e);
                                Vec::new()
                            }
                        };
                        tags_by_image.insert(image_id, tags.clone());
                        tags
                    }
                }
                None => Vec::new(),
            };

            debug!("Running container {} ({}) tags: {:?}", name, short_id(&id), image_tags);
            result.push(RunningContainer {
                id,
                name,
                image_tags,
            });
        }

        Ok(result)
    }

    /// Inspect a container and capture its configuration
    pub async fn snapshot(&self, id: &str) -> Result<ContainerConfigSnapshot, EngineError> {
        let inspect = self
            .client
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        snapshot_from_inspect(inspect)
    }

    /// Stop a container, giving it `grace` before the daemon kills it
    pub async fn stop(&self, id: &str, grace: Duration) -> Result<(), EngineError> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };

        // The daemon only answers once the container is down
        let stop_result = tokio::time::timeout(
            grace + STOP_SLACK,
            self.client.stop_container(id, Some(options)),
        )
        .await;

        match stop_result {
            Ok(Ok(_)) => {
                info!("Stopped container: {}", short_id(id));
                Ok(())
            }
            Ok(Err(bollard::errors::Error::JsonSerdeError { .. })) => {
                info!("Container {} stopped successfully (empty response)", short_id(id));
                Ok(())
            }
            Ok(Err(bollard::errors::Error::DockerResponseServerError { status_code: 304, .. })) => {
                info!("Container {} was already stopped", short_id(id));
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Failed to stop container {}: {}", short_id(id), e);
                Err(e.into())
            }
            Err(_) => {
                error!("Stop timed out for container {} - Docker daemon may be unresponsive", short_id(id));
                Err(EngineError::Timeout(format!(
                    "stop did not finish within {}s",
                    (grace + STOP_SLACK).as_secs()
                )))
            }
        }
    }

    /// Remove a stopped container
    pub async fn remove(&self, id: &str) -> Result<(), EngineError> {
        self.client
            .remove_container(id, Some(RemoveContainerOptions::default()))
            .await?;
        info!("Removed container: {}", short_id(id));
        Ok(())
    }

    /// Create a container from a snapshot, reusing the snapshot's name
    pub async fn create(&self, snapshot: &ContainerConfigSnapshot) -> Result<String, EngineError> {
        let options = CreateContainerOptions {
            name: snapshot.name.clone(),
            platform: None,
        };

        let response = self
            .client
            .create_container(Some(options), create_config(snapshot))
            .await?;

        for warning in &response.warnings {
            warn!("Create warning for {}: {}", snapshot.name, warning);
        }
        info!("Created container: {} ({})", snapshot.name, short_id(&response.id));

        Ok(response.id)
    }

    /// Start a container
    pub async fn start(&self, id: &str) -> Result<(), EngineError> {
        match self
            .client
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(_) => {
                info!("Successfully started container: {}", short_id(id));
                Ok(())
            }
            Err(bollard::errors::Error::JsonSerdeError { .. }) => {
                // Docker returns an empty body for start_container
                info!("Container {} started successfully (empty response from Docker API)", short_id(id));
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError { status_code: 304, .. }) => {
                info!("Container {} is already running", short_id(id));
                Ok(())
            }
            Err(e) => {
                error!("Docker API error when starting container {}: {}", short_id(id), e);
                Err(e.into())
            }
        }
    }
}
