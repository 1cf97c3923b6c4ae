//! In-memory collaborators for unit tests.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use reqwest::StatusCode;

use crate::error::{GatewayError, RuntimeError};
use crate::gateway::{Gateway, NodeInformation, Target, TargetList, Upstream};
use crate::runtime::{ContainerRuntime, EventStream};
use crate::types::{ContainerDetails, RunningContainer, RuntimeEvent, RuntimeVersion};

pub const LABEL: &str = "kong.upstream";

pub fn details(id: &str, ports: &[&str]) -> ContainerDetails {
    ContainerDetails {
        id: id.to_string(),
        name: format!("{}-name", id),
        exposed_ports: ports.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    }
}

pub fn event(kind: &str, action: &str, upstream: Option<&str>) -> RuntimeEvent {
    RuntimeEvent {
        kind: kind.to_string(),
        action: action.to_string(),
        actor_id: "abc".to_string(),
        attributes: upstream
            .map(|u| HashMap::from([(LABEL.to_string(), u.to_string())]))
            .unwrap_or_default(),
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    containers: Mutex<Vec<RunningContainer>>,
    details: HashMap<String, ContainerDetails>,
    failing_inspect: HashSet<String>,
    failing_list: bool,
    inspected: Mutex<Vec<String>>,
    subscriptions: Mutex<VecDeque<Vec<Result<RuntimeEvent, RuntimeError>>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(self, id: &str, upstream: &str, ip: &str, ports: &[&str]) -> Self {
        let labels = HashMap::from([(LABEL.to_string(), upstream.to_string())]);
        self.with_labels(id, labels, ip, ports)
    }

    pub fn with_unlabeled_container(self, id: &str, ip: &str, ports: &[&str]) -> Self {
        self.with_labels(id, HashMap::new(), ip, ports)
    }

    fn with_labels(
        mut self,
        id: &str,
        labels: HashMap<String, String>,
        ip: &str,
        ports: &[&str],
    ) -> Self {
        self.containers.get_mut().unwrap().push(RunningContainer {
            id: id.to_string(),
            state: "running".to_string(),
            labels,
        });
        let mut container = details(id, ports);
        container.ip_address = Some(ip.to_string());
        self.details.insert(id.to_string(), container);
        self
    }

    pub fn failing_inspect(mut self, id: &str) -> Self {
        self.failing_inspect.insert(id.to_string());
        self
    }

    pub fn failing_list(mut self) -> Self {
        self.failing_list = true;
        self
    }

    /// Queue the events delivered by one subscription, in order. Each call
    /// adds a subscription; once the queue is drained streams end at once.
    pub fn with_events(self, events: Vec<Result<RuntimeEvent, RuntimeError>>) -> Self {
        self.subscriptions.lock().unwrap().push_back(events);
        self
    }

    /// Mark a container as exited; it is still listed.
    pub fn stop(&self, id: &str) {
        let mut containers = self.containers.lock().unwrap();
        if let Some(c) = containers.iter_mut().find(|c| c.id == id) {
            c.state = "exited".to_string();
        }
    }

    pub fn inspected(&self) -> Vec<String> {
        self.inspected.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn version(&self) -> Result<RuntimeVersion, RuntimeError> {
        Ok(RuntimeVersion {
            version: "24.0.7".into(),
            api_version: "1.43".into(),
        })
    }

    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>, RuntimeError> {
        if self.failing_list {
            return Err(RuntimeError::unavailable("listing refused"));
        }
        Ok(self.containers.lock().unwrap().clone())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        self.inspected.lock().unwrap().push(id.to_string());
        if self.failing_inspect.contains(id) {
            return Err(RuntimeError::unavailable(format!("no such container: {}", id)));
        }
        self.details
            .get(id)
            .cloned()
            .ok_or_else(|| RuntimeError::unavailable(format!("no such container: {}", id)))
    }

    fn events(&self) -> EventStream {
        let events = self
            .subscriptions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default();
        stream::iter(events).boxed()
    }
}

#[derive(Default)]
struct GatewayState {
    upstreams: BTreeMap<String, Vec<Target>>,
    next_id: u32,
    calls: Vec<String>,
}

impl GatewayState {
    fn target(&mut self, address: &str, weight: u32) -> Target {
        self.next_id += 1;
        Target {
            id: format!("t{}", self.next_id),
            target: address.to_string(),
            weight,
            ..Default::default()
        }
    }
}

/// Kong stand-in recording every call as `"<operation> <args>"`.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<GatewayState>,
    failing: HashSet<String>,
    failing_deletes: HashSet<String>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_targets(self, upstream: &str, addresses: &[&str]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let targets = addresses
                .iter()
                .map(|address| state.target(address, 100))
                .collect();
            state.upstreams.insert(upstream.to_string(), targets);
        }
        self
    }

    /// Every call touching `upstream` fails with a 500.
    pub fn failing(mut self, upstream: &str) -> Self {
        self.failing.insert(upstream.to_string());
        self
    }

    /// Only `delete_target` on `upstream` fails with a 500.
    pub fn failing_deletes(mut self, upstream: &str) -> Self {
        self.failing_deletes.insert(upstream.to_string());
        self
    }

    pub fn has_upstream(&self, upstream: &str) -> bool {
        self.state.lock().unwrap().upstreams.contains_key(upstream)
    }

    pub fn addresses(&self, upstream: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .upstreams
            .get(upstream)
            .map(|targets| targets.iter().map(|t| t.target.clone()).collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: String, upstream: &str) -> Result<(), GatewayError> {
        self.state.lock().unwrap().calls.push(call);
        if self.failing.contains(upstream) {
            return Err(GatewayError::status(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("unable to reach upstream {}", upstream),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn node_information(&self) -> Result<NodeInformation, GatewayError> {
        Ok(NodeInformation {
            version: "0.11.2".into(),
            ..Default::default()
        })
    }

    async fn get_upstream(&self, name: &str) -> Result<Option<Upstream>, GatewayError> {
        self.record(format!("get_upstream {}", name), name)?;
        let state = self.state.lock().unwrap();
        Ok(state.upstreams.contains_key(name).then(|| Upstream {
            id: format!("{}-id", name),
            name: name.to_string(),
        }))
    }

    async fn create_upstream(&self, name: &str) -> Result<(), GatewayError> {
        self.record(format!("create_upstream {}", name), name)?;
        self.state
            .lock()
            .unwrap()
            .upstreams
            .entry(name.to_string())
            .or_default();
        Ok(())
    }

    async fn list_active_targets(&self, upstream: &str) -> Result<TargetList, GatewayError> {
        self.record(format!("list_active_targets {}", upstream), upstream)?;
        let state = self.state.lock().unwrap();
        let data = state.upstreams.get(upstream).cloned().unwrap_or_default();
        Ok(TargetList {
            total: data.len() as u64,
            data,
        })
    }

    async fn add_target(
        &self,
        upstream: &str,
        target: &str,
        weight: u32,
    ) -> Result<Target, GatewayError> {
        self.record(format!("add_target {} {} {}", upstream, target, weight), upstream)?;
        let mut state = self.state.lock().unwrap();
        let created = state.target(target, weight);
        state
            .upstreams
            .entry(upstream.to_string())
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn delete_target(&self, upstream: &str, id: &str) -> Result<(), GatewayError> {
        self.record(format!("delete_target {} {}", upstream, id), upstream)?;
        if self.failing_deletes.contains(upstream) {
            return Err(GatewayError::status(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("unable to delete target {} of upstream {}", id, upstream),
            ));
        }
        let mut state = self.state.lock().unwrap();
        if let Some(targets) = state.upstreams.get_mut(upstream) {
            targets.retain(|t| t.id != id);
        }
        Ok(())
    }
}
