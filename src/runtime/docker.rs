use super::{ContainerRuntime, EventStream};
use crate::error::RuntimeError;
use crate::resolver::leading_port;
use crate::types::{ContainerDetails, RunningContainer, RuntimeEvent, RuntimeVersion};
use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerInspectResponse, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::stream::StreamExt;
use log::debug;
use std::collections::HashMap;

/// Docker implementation of [`ContainerRuntime`].
pub struct DockerRuntime {
    docker: Docker,
    label: String,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon using default settings.
    /// This handles the unix socket on Linux.
    pub fn connect(label: impl Into<String>) -> Result<Self, RuntimeError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self {
            docker,
            label: label.into(),
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn version(&self) -> Result<RuntimeVersion, RuntimeError> {
        let version = self.docker.version().await?;
        let Some(server_version) = version.version else {
            return Err(RuntimeError::unavailable(
                "Docker daemon did not report a version",
            ));
        };
        Ok(RuntimeVersion {
            version: server_version,
            api_version: version.api_version.unwrap_or_default(),
        })
    }

    async fn list_running_containers(&self) -> Result<Vec<RunningContainer>, RuntimeError> {
        let opts = ListContainersOptions::<String> {
            all: false,
            filters: HashMap::from([("label".to_string(), vec![self.label.clone()])]),
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(opts)).await?;
        debug!("Docker listed {} labeled containers", containers.len());

        Ok(containers
            .into_iter()
            .filter_map(|c| {
                Some(RunningContainer {
                    id: c.id?,
                    state: c.state.unwrap_or_default(),
                    labels: c.labels.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, RuntimeError> {
        let detail = self.docker.inspect_container(id, None).await?;
        Ok(container_details(detail))
    }

    fn events(&self) -> EventStream {
        let opts = EventsOptions::<String> {
            filters: [
                ("type", ["container"].as_slice()),
                ("event", ["start", "die"].as_slice()),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
            .collect(),
            ..Default::default()
        };

        self.docker
            .events(Some(opts))
            .map(|msg| msg.map(runtime_event).map_err(RuntimeError::from))
            .boxed()
    }
}

/// Flatten an inspect response into [`ContainerDetails`].
///
/// The exposed port map comes back unordered, so ports are sorted by port
/// number to make "first exposed port" deterministic.
fn container_details(detail: ContainerInspectResponse) -> ContainerDetails {
    let mut exposed_ports: Vec<String> = detail
        .config
        .and_then(|c| c.exposed_ports)
        .map(|ports| ports.into_keys().collect())
        .unwrap_or_default();
    exposed_ports.sort_by_cached_key(|p| {
        let port = leading_port(p);
        (port.is_none(), port, p.clone())
    });

    let settings = detail.network_settings.unwrap_or_default();
    let networks = settings
        .networks
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(name, endpoint)| {
            endpoint
                .ip_address
                .filter(|ip| !ip.is_empty())
                .map(|ip| (name, ip))
        })
        .collect();

    ContainerDetails {
        id: detail.id.unwrap_or_default(),
        name: detail
            .name
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_default(),
        exposed_ports,
        ip_address: settings.ip_address.filter(|ip| !ip.is_empty()),
        networks,
        network_mode: detail.host_config.and_then(|h| h.network_mode),
    }
}

fn runtime_event(event: EventMessage) -> RuntimeEvent {
    let actor = event.actor.unwrap_or_default();
    RuntimeEvent {
        kind: event.typ.map(|t| t.to_string()).unwrap_or_default(),
        action: event.action.unwrap_or_default(),
        actor_id: actor.id.unwrap_or_default(),
        attributes: actor.attributes.unwrap_or_default(),
    }
}
