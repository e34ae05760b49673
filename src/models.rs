use bollard::models::{
    DeviceMapping, DeviceRequest, HealthConfig, HostConfigLogConfig, PortMap, ResourcesUlimits,
    RestartPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::RecreateStage;

pub const DEFAULT_TAG: &str = "latest";

/// A pullable `repository:tag` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    /// Returns `None` when the repository is empty. A missing or empty tag becomes `latest`.
    pub fn new(repository: &str, tag: Option<&str>) -> Option<Self> {
        let repository = repository.trim();
        if repository.is_empty() {
            return None;
        }
        let tag = tag
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TAG);
        Some(Self {
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_latest(&self) -> bool {
        self.tag == DEFAULT_TAG
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// A running container as seen by the locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunningContainer {
    pub id: String,
    pub name: String,
    /// Tags of the image the container runs, as resolved by the engine.
    pub image_tags: Vec<String>,
}

impl RunningContainer {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

/// Reproducible configuration of one container, read once before it is stopped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerConfigSnapshot {
    pub id: String,
    pub name: String,
    pub process: ProcessSpec,
    pub host: HostSpec,
    /// Network name -> attachment details.
    pub networks: BTreeMap<String, NetworkAttachment>,
}

/// Process level settings (the engine's `Config` section).
///
/// Flags default to the engine's own defaults when absent: `tty`, `open_stdin`,
/// `stdin_once` and `attach_stdin` are false, `attach_stdout` and `attach_stderr` are true.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    /// Image reference as the container recorded it, e.g. `app:latest`.
    pub image: Option<String>,
    pub env: BTreeMap<String, String>,
    pub labels: HashMap<String, String>,
    pub cmd: Option<Vec<String>>,
    pub entrypoint: Option<Vec<String>>,
    pub working_dir: Option<String>,
    pub hostname: Option<String>,
    pub domainname: Option<String>,
    pub user: Option<String>,
    pub tty: bool,
    pub open_stdin: bool,
    pub stdin_once: bool,
    pub attach_stdin: bool,
    pub attach_stdout: bool,
    pub attach_stderr: bool,
    pub stop_signal: Option<String>,
    pub stop_timeout: Option<i64>,
    pub healthcheck: Option<HealthConfig>,
    /// Declared anonymous volume paths.
    pub volumes: Vec<String>,
    /// Exposed ports in `port/proto` form.
    pub exposed_ports: Vec<String>,
}

impl Default for ProcessSpec {
    fn default() -> Self {
        Self {
            image: None,
            env: BTreeMap::new(),
            labels: HashMap::new(),
            cmd: None,
            entrypoint: None,
            working_dir: None,
            hostname: None,
            domainname: None,
            user: None,
            tty: false,
            open_stdin: false,
            stdin_once: false,
            attach_stdin: false,
            attach_stdout: true,
            attach_stderr: true,
            stop_signal: None,
            stop_timeout: None,
            healthcheck: None,
            volumes: Vec::new(),
            exposed_ports: Vec::new(),
        }
    }
}

/// Host level settings (the engine's `HostConfig` section). Boolean flags default to false.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSpec {
    pub binds: Option<Vec<String>>,
    pub port_bindings: Option<PortMap>,
    pub links: Option<Vec<String>>,
    pub privileged: bool,
    pub publish_all_ports: bool,
    pub readonly_rootfs: bool,
    pub dns: Option<Vec<String>>,
    pub dns_search: Option<Vec<String>>,
    pub extra_hosts: Option<Vec<String>>,
    pub volumes_from: Option<Vec<String>>,
    pub cap_add: Option<Vec<String>>,
    pub cap_drop: Option<Vec<String>>,
    pub group_add: Option<Vec<String>>,
    pub devices: Option<Vec<DeviceMapping>>,
    pub device_requests: Option<Vec<DeviceRequest>>,
    pub log_config: Option<HostConfigLogConfig>,
    pub pids_limit: Option<i64>,
    pub ulimits: Option<Vec<ResourcesUlimits>>,
    pub auto_remove: bool,
    pub volume_driver: Option<String>,
    pub shm_size: Option<i64>,
    pub sysctls: Option<HashMap<String, String>>,
    pub runtime: Option<String>,
    pub cgroup_parent: Option<String>,
    pub oom_kill_disable: bool,
    pub init: bool,
    pub network_mode: Option<String>,
    pub restart_policy: Option<RestartPolicy>,
}

/// How a container was attached to one network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkAttachment {
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
    /// The addresses were configured through IPAM rather than observed on the endpoint
    pub static_address: bool,
    pub aliases: Vec<String>,
    pub links: Vec<String>,
}

impl NetworkAttachment {
    /// Carry over addresses, aliases and legacy links when the old container had them.
    pub fn endpoint_request(&self) -> EndpointRequest {
        EndpointRequest {
            ipv4_address: self.ipv4_address.clone(),
            ipv6_address: self.ipv6_address.clone(),
            aliases: (!self.aliases.is_empty()).then(|| self.aliases.clone()),
            links: (!self.links.is_empty()).then(|| self.links.clone()),
        }
    }
}

/// Parameters for connecting a container to a network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointRequest {
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
    pub aliases: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
}

impl EndpointRequest {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn has_address(&self) -> bool {
        self.ipv4_address.is_some() || self.ipv6_address.is_some()
    }

    /// Same request, letting the daemon pick the addresses.
    pub fn without_address(&self) -> Self {
        Self {
            ipv4_address: None,
            ipv6_address: None,
            ..self.clone()
        }
    }
}

impl fmt::Display for EndpointRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            return f.write_str("default settings");
        }
        let mut parts = Vec::new();
        if let Some(ip) = &self.ipv4_address {
            parts.push(format!("ipv4_address={}", ip));
        }
        if let Some(ip) = &self.ipv6_address {
            parts.push(format!("ipv6_address={}", ip));
        }
        if let Some(aliases) = &self.aliases {
            parts.push(format!("aliases={:?}", aliases));
        }
        if let Some(links) = &self.links {
            parts.push(format!("links={:?}", links));
        }
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkWarning {
    pub network: String,
    pub message: String,
}

impl fmt::Display for NetworkWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network '{}': {}", self.network, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
}

/// Result of recreating one matched container.
#[derive(Debug, Clone, Serialize)]
pub struct RecreationOutcome {
    #[serde(rename = "name")]
    pub container_name: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<RecreateStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_container_id: Option<String>,
    pub detail: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<NetworkWarning>,
}

impl RecreationOutcome {
    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Success,
    PartialSuccess,
    Failure,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub updated_count: usize,
    pub failed_count: usize,
    pub outcomes: Vec<RecreationOutcome>,
}

impl BatchResult {
    pub fn record(&mut self, outcome: RecreationOutcome) {
        if outcome.succeeded() {
            self.updated_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn status(&self) -> BatchStatus {
        if self.failed_count == 0 {
            BatchStatus::Success
        } else if self.updated_count > 0 {
            BatchStatus::PartialSuccess
        } else {
            BatchStatus::Failure
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Update process finished. Successfully updated {} container(s), failed to update {} container(s).",
            self.updated_count, self.failed_count
        )
    }
}

/// What a successful update request did.
#[derive(Debug, Clone)]
pub enum UpdateReport {
    /// Image pulled, restart not requested.
    Pulled { image: ImageReference },
    /// Image pulled, no running container uses it.
    NothingToUpdate { image: ImageReference },
    /// Image pulled and matching containers were processed.
    Batch {
        image: ImageReference,
        result: BatchResult,
    },
}

/// Form body of `POST /images/pull`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    pub token: Option<String>,
    pub repository: Option<String>,
    pub tag: Option<String>,
    pub restart_containers: Option<String>,
}

impl PullRequest {
    pub fn restart_requested(&self) -> bool {
        self.restart_containers
            .as_deref()
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

#[derive(Debug, Serialize, Default)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub containers: Option<Vec<RecreationOutcome>>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn batch(result: BatchResult) -> Self {
        let (success, error) = match result.status() {
            BatchStatus::Success => (true, None),
            BatchStatus::PartialSuccess => {
                (false, Some("Partial success, some containers failed.".to_string()))
            }
            BatchStatus::Failure => (false, Some("All container updates failed.".to_string())),
        };
        Self {
            success,
            message: Some(result.summary()),
            error,
            updated: Some(result.updated_count),
            failed: Some(result.failed_count),
            containers: Some(result.outcomes),
        }
    }
}
