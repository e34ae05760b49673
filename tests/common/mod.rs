//! In-memory container engine for workflow and HTTP tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use imagehook::config::{CliArgs, Config};
use imagehook::error::EngineError;
use imagehook::models::{
    ContainerConfigSnapshot, EndpointRequest, HostSpec, ImageReference, NetworkAttachment,
    ProcessSpec, RunningContainer,
};
use imagehook::ContainerEngine;

pub const TOKEN: &str = "s3cret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Inspect,
    Stop,
    Remove,
    Create,
    Start,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Pull(String),
    List,
    Inspect(String),
    Stop(String, Duration),
    Remove(String),
    Create(String),
    InspectNetwork(String),
    Connect {
        network: String,
        container_id: String,
        endpoint: EndpointRequest,
    },
    Start(String),
}

#[derive(Default)]
struct State {
    pull_error: Option<EngineError>,
    list_error: Option<EngineError>,
    containers: Vec<RunningContainer>,
    snapshots: HashMap<String, ContainerConfigSnapshot>,
    networks: HashSet<String>,
    /// (operation, container name) -> injected failure
    failures: HashMap<(Op, String), EngineError>,
    /// network name -> injected connect failure
    connect_failures: HashMap<String, EngineError>,
    /// networks without a configured subnet: requested addresses are refused
    dynamic_only: HashSet<String>,
    created: Vec<ContainerConfigSnapshot>,
    calls: Vec<Call>,
    next_id: usize,
}

#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<Mutex<State>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running container whose image carries `tags`.
    pub fn with_container(self, snapshot: ContainerConfigSnapshot, tags: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.containers.push(RunningContainer {
                id: snapshot.id.clone(),
                name: snapshot.name.clone(),
                image_tags: tags.iter().map(|t| t.to_string()).collect(),
            });
            state.snapshots.insert(snapshot.id.clone(), snapshot);
        }
        self
    }

    pub fn with_network(self, name: &str) -> Self {
        self.state.lock().unwrap().networks.insert(name.to_string());
        self
    }

    pub fn fail_pull(self, error: EngineError) -> Self {
        self.state.lock().unwrap().pull_error = Some(error);
        self
    }

    pub fn fail_list(self, error: EngineError) -> Self {
        self.state.lock().unwrap().list_error = Some(error);
        self
    }

    pub fn fail(self, op: Op, container_name: &str, error: EngineError) -> Self {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert((op, container_name.to_string()), error);
        self
    }

    pub fn fail_connect(self, network: &str, error: EngineError) -> Self {
        self.state
            .lock()
            .unwrap()
            .connect_failures
            .insert(network.to_string(), error);
        self
    }

    /// Refuse connects to `network` that request a specific address.
    pub fn reject_static_address(self, network: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .dynamic_only
            .insert(network.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<ContainerConfigSnapshot> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    pub fn destructive_calls(&self) -> usize {
        self.count(|c| matches!(c, Call::Stop(..) | Call::Remove(_) | Call::Create(_)))
    }

    pub fn connects(&self) -> Vec<(String, EndpointRequest)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Connect {
                    network, endpoint, ..
                } => Some((network, endpoint)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    fn injected(&self, op: Op, id: &str) -> Option<EngineError> {
        let state = self.state.lock().unwrap();
        let name = state
            .snapshots
            .get(id)
            .map(|s| s.name.clone())
            .or_else(|| {
                state
                    .created
                    .iter()
                    .find(|s| s.id == id)
                    .map(|s| s.name.clone())
            })?;
        state.failures.get(&(op, name)).cloned()
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn pull_image(&self, image: &ImageReference) -> Result<(), EngineError> {
        self.record(Call::Pull(image.to_string()));
        match self.state.lock().unwrap().pull_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>, EngineError> {
        self.record(Call::List);
        let state = self.state.lock().unwrap();
        match state.list_error.clone() {
            Some(e) => Err(e),
            None => Ok(state.containers.clone()),
        }
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerConfigSnapshot, EngineError> {
        self.record(Call::Inspect(id.to_string()));
        if let Some(e) = self.injected(Op::Inspect, id) {
            return Err(e);
        }
        self.state
            .lock()
            .unwrap()
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("no such container: {}", id)))
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> Result<(), EngineError> {
        self.record(Call::Stop(id.to_string(), grace));
        if let Some(e) = self.injected(Op::Stop, id) {
            return Err(e);
        }
        let mut state = self.state.lock().unwrap();
        let auto_remove = state.snapshots.get(id).is_some_and(|s| s.host.auto_remove);
        if auto_remove {
            state.containers.retain(|c| c.id != id);
        }
        Ok(())
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Remove(id.to_string()));
        if let Some(e) = self.injected(Op::Remove, id) {
            return Err(e);
        }
        let mut state = self.state.lock().unwrap();
        if !state.containers.iter().any(|c| c.id == id) {
            return Err(EngineError::NotFound(format!("no such container: {}", id)));
        }
        state.containers.retain(|c| c.id != id);
        Ok(())
    }

    async fn create_container(&self, snapshot: &ContainerConfigSnapshot) -> Result<String, EngineError> {
        self.record(Call::Create(snapshot.name.clone()));
        let mut state = self.state.lock().unwrap();
        if let Some(e) = state.failures.get(&(Op::Create, snapshot.name.clone())) {
            return Err(e.clone());
        }
        if state.containers.iter().any(|c| c.name == snapshot.name) {
            return Err(EngineError::api(
                409,
                format!("container name \"/{}\" is already in use", snapshot.name),
            ));
        }
        state.next_id += 1;
        let id = format!("{:0>12}-{}", state.next_id, snapshot.name);
        let mut created = snapshot.clone();
        created.id = id.clone();
        state.created.push(created);
        Ok(id)
    }

    async fn inspect_network(&self, name: &str) -> Result<String, EngineError> {
        self.record(Call::InspectNetwork(name.to_string()));
        if self.state.lock().unwrap().networks.contains(name) {
            Ok(format!("net-{}", name))
        } else {
            Err(EngineError::NotFound(format!("network {} not found", name)))
        }
    }

    async fn connect_network(
        &self,
        network: &str,
        container_id: &str,
        endpoint: &EndpointRequest,
    ) -> Result<(), EngineError> {
        self.record(Call::Connect {
            network: network.to_string(),
            container_id: container_id.to_string(),
            endpoint: endpoint.clone(),
        });
        let state = self.state.lock().unwrap();
        if let Some(e) = state.connect_failures.get(network) {
            return Err(e.clone());
        }
        if state.dynamic_only.contains(network) && endpoint.has_address() {
            return Err(EngineError::api(
                400,
                "user specified IP address is supported only when connecting to networks with user configured subnets",
            ));
        }
        Ok(())
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.record(Call::Start(id.to_string()));
        match self.injected(Op::Start, id) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// A container running `image` on the default bridge network.
pub fn snapshot(name: &str, image: &str) -> ContainerConfigSnapshot {
    let mut env = BTreeMap::new();
    env.insert("APP_NAME".to_string(), name.to_string());
    env.insert("PATH".to_string(), "/usr/local/bin:/usr/bin".to_string());

    let mut networks = BTreeMap::new();
    networks.insert("bridge".to_string(), NetworkAttachment::default());

    ContainerConfigSnapshot {
        id: format!("{}0123456789abcdef", name),
        name: name.to_string(),
        process: ProcessSpec {
            image: Some(image.to_string()),
            env,
            labels: HashMap::from([("com.example.role".to_string(), name.to_string())]),
            cmd: Some(vec!["serve".to_string(), "--port=80".to_string()]),
            exposed_ports: vec!["80/tcp".to_string()],
            volumes: vec!["/data".to_string()],
            ..Default::default()
        },
        host: HostSpec {
            binds: Some(vec![format!("/srv/{}:/data", name)]),
            network_mode: Some("bridge".to_string()),
            ..Default::default()
        },
        networks,
    }
}

pub fn config(extra: &[&str]) -> Config {
    let mut argv = vec!["imagehook", "--token", TOKEN];
    argv.extend_from_slice(extra);
    Config::from_args(CliArgs::try_parse_from(argv).unwrap()).unwrap()
}
