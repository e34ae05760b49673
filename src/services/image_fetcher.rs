use std::sync::Arc;
use tracing::{error, info};

use crate::docker::ContainerEngine;
use crate::error::{EngineError, PullError};
use crate::models::ImageReference;

/// Pulls images from the registry. No retries; the caller reports and stops.
pub struct ImageFetcher {
    engine: Arc<dyn ContainerEngine>,
}

impl ImageFetcher {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    pub async fn pull(&self, image: &ImageReference) -> Result<(), PullError> {
        info!("Pulling new image: {}...", image);

        match self.engine.pull_image(image).await {
            Ok(()) => {
                info!("Successfully pulled {}", image);
                Ok(())
            }
            Err(EngineError::NotFound(message)) => {
                error!("Image '{}' not found in registry: {}", image, message);
                Err(PullError::ImageNotFound(image.to_string()))
            }
            Err(e @ (EngineError::Api { .. } | EngineError::Timeout(_))) => {
                error!("Error pulling image {}: {}", image, e);
                Err(PullError::Api(image.to_string(), e.to_string()))
            }
            Err(EngineError::Other(message)) => {
                error!("An unexpected error occurred while pulling image {}: {}", image, message);
                Err(PullError::Unexpected(image.to_string(), message))
            }
        }
    }
}
