use bollard::models::{EndpointIpamConfig, EndpointSettings};
use bollard::network::{ConnectNetworkOptions, InspectNetworkOptions};
use bollard::Docker;
use tracing::info;

use crate::error::EngineError;
use crate::models::{short_id, EndpointRequest};

/// Network lookups and attachments
pub struct NetworkManager {
    client: Docker,
}

impl NetworkManager {
    pub fn from_ref(client: &Docker) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Resolve a network name to its id
    pub async fn resolve(&self, name: &str) -> Result<String, EngineError> {
        let network = self
            .client
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await?;
        Ok(network.id.unwrap_or_else(|| name.to_string()))
    }

    pub async fn connect(
        &self,
        network: &str,
        container_id: &str,
        endpoint: &EndpointRequest,
    ) -> Result<(), EngineError> {
        let options = ConnectNetworkOptions {
            container: container_id.to_string(),
            endpoint_config: endpoint_settings(endpoint),
        };
        self.client.connect_network(network, options).await?;
        info!("Connected container {} to network '{}'", short_id(container_id), network);
        Ok(())
    }
}

/// Static addresses must go through the IPAM config to be honoured by the daemon.
pub(super) fn endpoint_settings(endpoint: &EndpointRequest) -> EndpointSettings {
    let ipam_config = if endpoint.ipv4_address.is_some() || endpoint.ipv6_address.is_some() {
        Some(EndpointIpamConfig {
            ipv4_address: endpoint.ipv4_address.clone(),
            ipv6_address: endpoint.ipv6_address.clone(),
            ..Default::default()
        })
    } else {
        None
    };

    EndpointSettings {
        ipam_config,
        aliases: endpoint.aliases.clone(),
        links: endpoint.links.clone(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_address_goes_into_ipam_config() {
        let settings = endpoint_settings(&EndpointRequest {
            ipv4_address: Some("10.0.0.5".to_string()),
            aliases: Some(vec!["db".to_string()]),
            ..Default::default()
        });

        let ipam = settings.ipam_config.unwrap();
        assert_eq!(ipam.ipv4_address.as_deref(), Some("10.0.0.5"));
        assert_eq!(ipam.ipv6_address, None);
        assert_eq!(settings.aliases, Some(vec!["db".to_string()]));
    }

    #[test]
    fn default_request_has_no_ipam_config() {
        let settings = endpoint_settings(&EndpointRequest::default());
        assert!(settings.ipam_config.is_none());
        assert!(settings.aliases.is_none());
    }
}
