use bollard::auth::DockerCredentials;
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::ImageReference;

/// Image pulls and tag lookups
pub struct ImageManager {
    client: Docker,
}

impl ImageManager {
    pub fn from_ref(client: &Docker) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Pull `repository:tag`, draining the progress stream. The first error in the
    /// stream ends the pull.
    pub async fn pull(
        &self,
        image: &ImageReference,
        credentials: Option<DockerCredentials>,
    ) -> Result<(), EngineError> {
        let options = CreateImageOptions {
            from_image: image.repository().to_string(),
            tag: image.tag().to_string(),
            ..Default::default()
        };

        let mut stream = self.client.create_image(Some(options), None, credentials);

        while let Some(result) = stream.next().await {
            match result {
                Ok(info) => {
                    if let Some(message) = info.error {
                        return Err(classify_stream_error(message));
                    }
                    if let Some(status) = info.status {
                        debug!("Image pull {}: {}", image, status);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!("Pulled image {}", image);
        Ok(())
    }

    /// Repository tags of a local image, e.g. `["app:latest", "app:1.4"]`.
    pub async fn tags(&self, image_id: &str) -> Result<Vec<String>, EngineError> {
        let inspect = self.client.inspect_image(image_id).await?;
        Ok(inspect.repo_tags.unwrap_or_default())
    }
}

/// Registries report a missing repository or tag inside the progress stream on some
/// daemon versions instead of answering 404.
fn classify_stream_error(message: String) -> EngineError {
    let lower = message.to_lowercase();
    if lower.contains("not found")
        || lower.contains("manifest unknown")
        || lower.contains("repository does not exist")
    {
        EngineError::NotFound(message)
    } else {
        EngineError::api(500, message)
    }
}
