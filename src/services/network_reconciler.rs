//! Restores network attachments that `network_mode` does not cover.
//!
//! Failures here degrade connectivity of the new container but never fail its
//! recreation; each one becomes a [`NetworkWarning`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::docker::ContainerEngine;
use crate::error::EngineError;
use crate::models::{EndpointRequest, NetworkAttachment, NetworkWarning};

pub struct NetworkReconciler {
    engine: Arc<dyn ContainerEngine>,
}

impl NetworkReconciler {
    pub fn new(engine: Arc<dyn ContainerEngine>) -> Self {
        Self { engine }
    }

    /// Connect `container_id` to every network in `networks` except the one already
    /// wired at creation through `network_mode`.
    pub async fn reconnect(
        &self,
        container_id: &str,
        networks: &BTreeMap<String, NetworkAttachment>,
        network_mode: Option<&str>,
    ) -> Vec<NetworkWarning> {
        let mut warnings = Vec::new();

        for (name, attachment) in networks {
            if covered_by_network_mode(name, network_mode) {
                continue;
            }

            if let Err(e) = self.engine.inspect_network(name).await {
                let message = match e {
                    EngineError::NotFound(_) => "network not found, skipping".to_string(),
                    other => format!("failed to resolve network: {}", other),
                };
                warn!("Warning: network '{}': {}", name, message);
                warnings.push(NetworkWarning {
                    network: name.clone(),
                    message,
                });
                continue;
            }

            let endpoint = attachment.endpoint_request();
            info!("Connecting new container to network '{}' with {}...", name, endpoint);

            match self.connect(name, container_id, &endpoint).await {
                Ok(None) => info!("New container connected to network '{}'.", name),
                Ok(Some(message)) => {
                    warn!("Warning: network '{}': {}", name, message);
                    warnings.push(NetworkWarning {
                        network: name.clone(),
                        message,
                    });
                }
                Err(e) => {
                    warn!("Warning: Failed to connect new container to network '{}': {}", name, e);
                    warnings.push(NetworkWarning {
                        network: name.clone(),
                        message: format!("failed to connect: {}", e),
                    });
                }
            }
        }

        warnings
    }

    /// Connect once as requested. When a requested address is refused, connect again
    /// without it; the returned message says which address was dropped.
    async fn connect(
        &self,
        network: &str,
        container_id: &str,
        endpoint: &EndpointRequest,
    ) -> Result<Option<String>, EngineError> {
        match self.engine.connect_network(network, container_id, endpoint).await {
            Ok(()) => Ok(None),
            Err(e) if endpoint.has_address() => {
                warn!(
                    "Network '{}' refused the requested address ({}), retrying without it",
                    network, e
                );
                let dynamic = endpoint.without_address();
                self.engine
                    .connect_network(network, container_id, &dynamic)
                    .await?;
                Ok(Some(format!(
                    "connected without static address ({}): {}",
                    address_list(endpoint),
                    e
                )))
            }
            Err(e) => Err(e),
        }
    }
}

/// The daemon reports the `default` network mode as the `bridge` network.
fn covered_by_network_mode(network: &str, network_mode: Option<&str>) -> bool {
    match network_mode {
        Some(mode) if mode == network => true,
        Some("default") => network == "bridge",
        _ => false,
    }
}

fn address_list(endpoint: &EndpointRequest) -> String {
    [&endpoint.ipv4_address, &endpoint.ipv6_address]
        .into_iter()
        .flatten()
        .cloned()
        .collect::<Vec<_>>()
        .join(", ")
}
