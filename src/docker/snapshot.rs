//! Translation between engine inspect data and [`ContainerConfigSnapshot`].
//!
//! `snapshot_from_inspect` reads what the engine reports about a live container;
//! `create_config` turns a snapshot back into a create request. The network named by
//! a user-defined `network_mode` is attached at create time with its aliases and IPAM
//! addresses; every other attachment is restored afterwards by the network reconciler.

use bollard::container::{Config, NetworkingConfig};
use bollard::models::{
    ContainerConfig, ContainerInspectResponse, EndpointSettings, HostConfig,
};
use std::collections::{BTreeMap, HashMap};

use super::network::endpoint_settings;
use crate::error::EngineError;
use crate::models::{ContainerConfigSnapshot, HostSpec, NetworkAttachment, ProcessSpec};

pub fn snapshot_from_inspect(
    inspect: ContainerInspectResponse,
) -> Result<ContainerConfigSnapshot, EngineError> {
    let id = inspect
        .id
        .ok_or_else(|| EngineError::Other("inspect response has no container id".to_string()))?;
    let name = inspect
        .name
        .map(|n| n.trim_start_matches('/').to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| EngineError::Other(format!("container {} has no name", id)))?;

    let host_config = inspect.host_config.unwrap_or_default();
    let networks = inspect
        .network_settings
        .and_then(|s| s.networks)
        .unwrap_or_default()
        .into_iter()
        .map(|(name, endpoint)| (name, attachment_from_endpoint(endpoint)))
        .collect();

    Ok(ContainerConfigSnapshot {
        id,
        name,
        process: process_spec(inspect.config.unwrap_or_default()),
        host: host_spec(host_config),
        networks,
    })
}

fn process_spec(config: ContainerConfig) -> ProcessSpec {
    let defaults = ProcessSpec::default();

    ProcessSpec {
        image: config.image,
        env: config.env.map(parse_env).unwrap_or_default(),
        labels: config.labels.unwrap_or_default(),
        cmd: config.cmd,
        entrypoint: config.entrypoint,
        working_dir: non_empty(config.working_dir),
        hostname: non_empty(config.hostname),
        domainname: non_empty(config.domainname),
        user: non_empty(config.user),
        tty: config.tty.unwrap_or(defaults.tty),
        open_stdin: config.open_stdin.unwrap_or(defaults.open_stdin),
        stdin_once: config.stdin_once.unwrap_or(defaults.stdin_once),
        attach_stdin: config.attach_stdin.unwrap_or(defaults.attach_stdin),
        attach_stdout: config.attach_stdout.unwrap_or(defaults.attach_stdout),
        attach_stderr: config.attach_stderr.unwrap_or(defaults.attach_stderr),
        stop_signal: non_empty(config.stop_signal),
        stop_timeout: config.stop_timeout,
        healthcheck: config.healthcheck,
        volumes: sorted_keys(config.volumes),
        exposed_ports: sorted_keys(config.exposed_ports),
    }
}

fn host_spec(host: HostConfig) -> HostSpec {
    HostSpec {
        binds: host.binds,
        port_bindings: host.port_bindings,
        links: host.links,
        privileged: host.privileged.unwrap_or(false),
        publish_all_ports: host.publish_all_ports.unwrap_or(false),
        readonly_rootfs: host.readonly_rootfs.unwrap_or(false),
        dns: host.dns,
        dns_search: host.dns_search,
        extra_hosts: host.extra_hosts,
        volumes_from: host.volumes_from,
        cap_add: host.cap_add,
        cap_drop: host.cap_drop,
        group_add: host.group_add,
        devices: host.devices,
        device_requests: host.device_requests,
        log_config: host.log_config,
        pids_limit: host.pids_limit,
        ulimits: host.ulimits,
        auto_remove: host.auto_remove.unwrap_or(false),
        volume_driver: non_empty(host.volume_driver),
        shm_size: host.shm_size,
        sysctls: host.sysctls,
        runtime: non_empty(host.runtime),
        cgroup_parent: non_empty(host.cgroup_parent),
        oom_kill_disable: host.oom_kill_disable.unwrap_or(false),
        init: host.init.unwrap_or(false),
        network_mode: non_empty(host.network_mode),
        restart_policy: host.restart_policy,
    }
}

/// Static addresses come from the endpoint's IPAM config first, then from the
/// addresses the engine observed on the endpoint.
pub fn attachment_from_endpoint(endpoint: EndpointSettings) -> NetworkAttachment {
    let ipam = endpoint.ipam_config.unwrap_or_default();
    let ipam_v4 = non_empty(ipam.ipv4_address);
    let ipam_v6 = non_empty(ipam.ipv6_address);

    NetworkAttachment {
        static_address: ipam_v4.is_some() || ipam_v6.is_some(),
        ipv4_address: ipam_v4.or_else(|| non_empty(endpoint.ip_address)),
        ipv6_address: ipam_v6.or_else(|| non_empty(endpoint.global_ipv6_address)),
        aliases: endpoint.aliases.unwrap_or_default(),
        links: endpoint.links.unwrap_or_default(),
    }
}

/// Build the create request for the replacement container.
pub fn create_config(snapshot: &ContainerConfigSnapshot) -> Config<String> {
    let process = &snapshot.process;
    let host = &snapshot.host;

    let host_config = HostConfig {
        binds: host.binds.clone(),
        port_bindings: host.port_bindings.clone(),
        links: host.links.clone(),
        privileged: Some(host.privileged),
        publish_all_ports: Some(host.publish_all_ports),
        readonly_rootfs: Some(host.readonly_rootfs),
        dns: host.dns.clone(),
        dns_search: host.dns_search.clone(),
        extra_hosts: host.extra_hosts.clone(),
        volumes_from: host.volumes_from.clone(),
        cap_add: host.cap_add.clone(),
        cap_drop: host.cap_drop.clone(),
        group_add: host.group_add.clone(),
        devices: host.devices.clone(),
        device_requests: host.device_requests.clone(),
        log_config: host.log_config.clone(),
        pids_limit: host.pids_limit,
        ulimits: host.ulimits.clone(),
        auto_remove: Some(host.auto_remove),
        volume_driver: host.volume_driver.clone(),
        shm_size: host.shm_size,
        sysctls: host.sysctls.clone(),
        runtime: host.runtime.clone(),
        cgroup_parent: host.cgroup_parent.clone(),
        oom_kill_disable: Some(host.oom_kill_disable),
        init: Some(host.init),
        network_mode: host.network_mode.clone(),
        restart_policy: host.restart_policy.clone(),
        ..Default::default()
    };

    Config {
        image: process.image.clone(),
        env: if process.env.is_empty() {
            None
        } else {
            Some(
                process
                    .env
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect(),
            )
        },
        labels: if process.labels.is_empty() {
            None
        } else {
            Some(process.labels.clone())
        },
        cmd: process.cmd.clone(),
        entrypoint: process.entrypoint.clone(),
        working_dir: process.working_dir.clone(),
        hostname: process.hostname.clone(),
        domainname: process.domainname.clone(),
        user: process.user.clone(),
        tty: Some(process.tty),
        open_stdin: Some(process.open_stdin),
        stdin_once: Some(process.stdin_once),
        attach_stdin: Some(process.attach_stdin),
        attach_stdout: Some(process.attach_stdout),
        attach_stderr: Some(process.attach_stderr),
        stop_signal: process.stop_signal.clone(),
        stop_timeout: process.stop_timeout,
        healthcheck: process.healthcheck.clone(),
        volumes: key_set(&process.volumes),
        exposed_ports: key_set(&process.exposed_ports),
        host_config: Some(host_config),
        networking_config: network_mode_endpoint(snapshot),
        ..Default::default()
    }
}

/// Endpoint settings for the `network_mode` network, so aliases survive the swap.
/// Observed addresses are left to the daemon: it refuses them at create time on
/// networks without a configured subnet.
fn network_mode_endpoint(snapshot: &ContainerConfigSnapshot) -> Option<NetworkingConfig<String>> {
    let mode = snapshot
        .host
        .network_mode
        .as_deref()
        .filter(|m| is_user_defined_network(m))?;
    let attachment = snapshot.networks.get(mode)?;

    let mut request = attachment.endpoint_request();
    if !attachment.static_address {
        request = request.without_address();
    }
    if request.is_default() {
        return None;
    }

    Some(NetworkingConfig {
        endpoints_config: HashMap::from([(mode.to_string(), endpoint_settings(&request))]),
    })
}

/// Built-in modes take no endpoint settings.
fn is_user_defined_network(mode: &str) -> bool {
    !matches!(mode, "bridge" | "default" | "host" | "none") && !mode.starts_with("container:")
}

/// `KEY=VALUE` entries into a map. An entry without `=` keeps an empty value.
fn parse_env(entries: Vec<String>) -> BTreeMap<String, String> {
    entries
        .into_iter()
        .map(|entry| match entry.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (entry, String::new()),
        })
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn sorted_keys(map: Option<HashMap<String, HashMap<(), ()>>>) -> Vec<String> {
    let mut keys: Vec<String> = map.unwrap_or_default().into_keys().collect();
    keys.sort();
    keys
}

fn key_set(keys: &[String]) -> Option<HashMap<String, HashMap<(), ()>>> {
    if keys.is_empty() {
        None
    } else {
        Some(keys.iter().map(|k| (k.clone(), HashMap::new())).collect())
    }
}
