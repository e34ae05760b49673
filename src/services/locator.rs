use std::sync::Arc;
use tracing::{error, info};

use crate::docker::ContainerEngine;
use crate::error::LocateError;
use crate::models::{ImageReference, RunningContainer};

/// Why a container was selected for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The image's tags contain `repository:tag`.
    Exact,
    /// `tag` is `latest` and the image's tags contain the bare repository.
    ImplicitLatest,
}

/// Decide whether a container whose image carries `tags` runs `image`.
///
/// The bare-repository rule only applies to `latest`. A container started from
/// another tag must list that exact tag to match.
pub fn match_image(image: &ImageReference, tags: &[String]) -> Option<MatchKind> {
    let full = image.to_string();
    if tags.iter().any(|t| *t == full) {
        Some(MatchKind::Exact)
    } else if image.is_latest() && tags.iter().any(|t| t == image.repository()) {
        Some(MatchKind::ImplicitLatest)
    } else {
        None
    }
}

/// Finds running containers backed by a given image reference.
pub struct ContainerLocator {
    engine: Arc<dyn ContainerEngine>,
}

impl ContainerLocator {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// An empty result is not an error: nothing runs the image.
    pub async fn find_matches(
        &self,
        image: &ImageReference,
    ) -> Result<Vec<RunningContainer>, LocateError> {
        info!("Scanning for running containers based on image '{}'...", image);

        let containers = self.engine.list_running_containers().await.map_err(|e| {
            error!("Error listing containers: {}", e);
            LocateError::ListFailed(e.to_string())
        })?;

        let matches: Vec<RunningContainer> = containers
            .into_iter()
            .filter(|container| match match_image(image, &container.image_tags) {
                Some(MatchKind::Exact) => {
                    info!(" - Found container to update: {} (ID: {})", container.name, container.short_id());
                    true
                }
                Some(MatchKind::ImplicitLatest) => {
                    info!(
                        " - Found container to update (implicit latest): {} (ID: {})",
                        container.name,
                        container.short_id()
                    );
                    true
                }
                None => false,
            })
            .collect();

        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn exact_tag_matches() {
        let image = ImageReference::new("registry.local/app", Some("1.4")).unwrap();
        assert_eq!(
            match_image(&image, &tags(&["registry.local/app:1.4"])),
            Some(MatchKind::Exact)
        );
        assert_eq!(match_image(&image, &tags(&["registry.local/app:1.3"])), None);
    }

    #[test]
    fn bare_repository_matches_only_latest() {
        let latest = ImageReference::new("app", None).unwrap();
        assert_eq!(
            match_image(&latest, &tags(&["app"])),
            Some(MatchKind::ImplicitLatest)
        );

        let pinned = ImageReference::new("app", Some("2.0")).unwrap();
        assert_eq!(match_image(&pinned, &tags(&["app"])), None);
    }

    #[test]
    fn exact_match_takes_precedence() {
        let latest = ImageReference::new("app", Some("latest")).unwrap();
        assert_eq!(
            match_image(&latest, &tags(&["app", "app:latest"])),
            Some(MatchKind::Exact)
        );
    }

    #[test]
    fn untagged_image_never_matches() {
        let latest = ImageReference::new("app", None).unwrap();
        assert_eq!(match_image(&latest, &[]), None);
    }
}
