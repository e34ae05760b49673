pub mod client;
pub mod container;
pub mod engine;
pub mod image;
pub mod network;
pub mod snapshot;

pub use client::DockerClient;
pub use container::ContainerManager;
pub use engine::ContainerEngine;
pub use image::ImageManager;
pub use network::NetworkManager;
