pub mod container_lifecycle;
pub mod image_fetcher;
pub mod locator;
pub mod network_reconciler;
pub mod orchestrator;

pub use container_lifecycle::{ContainerRecreator, DEFAULT_STOP_GRACE};
pub use image_fetcher::ImageFetcher;
pub use locator::{match_image, ContainerLocator, MatchKind};
pub use network_reconciler::NetworkReconciler;
pub use orchestrator::UpdateOrchestrator;
