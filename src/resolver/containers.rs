use log::{debug, error, warn};

use crate::error::RuntimeError;
use crate::runtime::ContainerRuntime;
use crate::types::{ContainerDetails, UpstreamTargets};

/// Address used for containers sharing the host network stack.
const HOST_NETWORK_IP: &str = "127.0.0.1";

/// Builds the desired target lists from the running containers.
pub struct ContainerTargetResolver<'a> {
    runtime: &'a dyn ContainerRuntime,
    label: &'a str,
}

impl<'a> ContainerTargetResolver<'a> {
    pub fn new(runtime: &'a dyn ContainerRuntime, label: &'a str) -> Self {
        Self { runtime, label }
    }

    /// Group the targets of running containers by upstream name.
    ///
    /// With `Some(name)` only containers labeled with that upstream are
    /// inspected. A container that cannot be inspected or has no usable
    /// address is skipped; only a failed listing is an error.
    pub async fn resolve(&self, upstream: Option<&str>) -> Result<UpstreamTargets, RuntimeError> {
        let filter = upstream.filter(|name| !name.is_empty());
        let containers = self.runtime.list_running_containers().await?;

        let mut upstreams = UpstreamTargets::new();
        for container in containers {
            if !container.is_running() {
                continue;
            }
            let Some(name) = container.labels.get(self.label) else {
                continue;
            };
            if filter.is_some_and(|wanted| wanted != name.as_str()) {
                continue;
            }

            let details = match self.runtime.inspect_container(&container.id).await {
                Ok(details) => details,
                Err(e) => {
                    error!("container={} unable to get container details: {}", container.id, e);
                    continue;
                }
            };
            if let Some(target) = container_target(&details) {
                upstreams.entry(name.clone()).or_default().push(target);
            }
        }
        Ok(upstreams)
    }
}

/// Resolve the `ip:port` target of an inspected container.
///
/// Only the first exposed port is used. The address is, in order: the
/// container's own IP, the IP on its first attached network (by network
/// name), loopback when it runs on the host network. Host IP lookup for
/// other network modes is not supported; such containers get no target.
pub fn container_target(details: &ContainerDetails) -> Option<String> {
    let Some(exposed) = details.exposed_ports.first() else {
        warn!("container={} no port exposed -> container ignored", details.id);
        return None;
    };
    let Some(port) = leading_port(exposed) else {
        warn!(
            "container={} unusable exposed port {:?} -> container ignored",
            details.id, exposed
        );
        return None;
    };

    let ip = if let Some(ip) = details.ip_address.as_deref() {
        ip
    } else if let Some(ip) = details.networks.values().next() {
        ip.as_str()
    } else if details.uses_host_network() {
        HOST_NETWORK_IP
    } else {
        warn!(
            "container={} no IP address resolved (network mode {:?}) -> container ignored",
            details.id, details.network_mode
        );
        return None;
    };

    let target = format!("{}:{}", ip, port);
    debug!(
        "container={} name={} resolved container target {}",
        details.id, details.name, target
    );
    Some(target)
}

/// Port number from the leading digits of an exposed port such as `8080/tcp`.
pub fn leading_port(exposed: &str) -> Option<u16> {
    let end = exposed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(exposed.len());
    exposed[..end].parse().ok()
}
