pub mod auth;
pub mod config;
pub mod docker;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod types;

pub use config::Config;
pub use docker::{ContainerEngine, DockerClient};
pub use handlers::create_app;
pub use services::UpdateOrchestrator;
pub use types::AppState;
