use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use super::{ContainerLocator, ContainerRecreator, ImageFetcher};
use crate::docker::ContainerEngine;
use crate::error::UpdateError;
use crate::models::{BatchResult, ImageReference, UpdateReport};

/// Drives one update request: pull, locate, recreate each match.
pub struct UpdateOrchestrator {
    fetcher: ImageFetcher,
    locator: ContainerLocator,
    recreator: ContainerRecreator,
    parallelism: usize,
}

impl UpdateOrchestrator {
    /// `parallelism` bounds how many containers are recreated at once; 1 is sequential.
    pub fn new(engine: Arc<dyn ContainerEngine>, stop_grace: Duration, parallelism: usize) -> Self {
        Self {
            fetcher: ImageFetcher::new(engine.clone()),
            locator: ContainerLocator::new(engine.clone()),
            recreator: ContainerRecreator::new(engine, stop_grace),
            parallelism: parallelism.max(1),
        }
    }

    /// Errors are returned only for failures that happen before any container is
    /// touched. Per-container failures are part of the returned batch.
    pub async fn run(
        &self,
        image: &ImageReference,
        restart_requested: bool,
    ) -> Result<UpdateReport, UpdateError> {
        self.fetcher.pull(image).await?;

        if !restart_requested {
            info!("Option 'restart_containers' is false. Image pulled, but no containers will be restarted.");
            return Ok(UpdateReport::Pulled {
                image: image.clone(),
            });
        }

        let matches = self.locator.find_matches(image).await?;
        if matches.is_empty() {
            info!("No running containers found using image '{}'. Nothing to update.", image);
            return Ok(UpdateReport::NothingToUpdate {
                image: image.clone(),
            });
        }

        info!("Found {} container(s) to update.", matches.len());

        let recreator = &self.recreator;
        let outcomes: Vec<_> = stream::iter(matches)
            .map(|container| async move { recreator.recreate(&container).await })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        let mut result = BatchResult::default();
        for outcome in outcomes {
            result.record(outcome);
        }
        info!("{}", result.summary());

        Ok(UpdateReport::Batch {
            image: image.clone(),
            result,
        })
    }
}
