//! Data structures used throughout the daemon.
//!
//! Container-side types are runtime neutral: the Docker adapter converts
//! its API models into them so the resolver and the listener never see
//! `bollard` types.  They only live for one resolution pass or one event.

use std::collections::{BTreeMap, HashMap};

/// Upstream name mapped to its ordered list of `host:port` targets.
///
/// A sorted map keeps reconciliation passes and their logs in a stable
/// order.
pub type UpstreamTargets = BTreeMap<String, Vec<String>>;

/// Server version reported by the container runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeVersion {
    pub version: String,
    pub api_version: String,
}

/// A container as returned by the runtime's listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunningContainer {
    pub id: String,
    pub state: String,
    pub labels: HashMap<String, String>,
}

impl RunningContainer {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// The parts of a container inspection needed to build a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerDetails {
    pub id: String,
    pub name: String,
    /// Exposed ports such as `8080/tcp`, lowest port number first.
    pub exposed_ports: Vec<String>,
    /// Address on the default bridge, if any.
    pub ip_address: Option<String>,
    /// Attached network name to address, empty addresses excluded.
    pub networks: BTreeMap<String, String>,
    pub network_mode: Option<String>,
}

impl ContainerDetails {
    pub fn uses_host_network(&self) -> bool {
        self.network_mode.as_deref() == Some("host")
    }
}

/// One message of the runtime event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEvent {
    /// Object type, e.g. `container` or `network`.
    pub kind: String,
    pub action: String,
    pub actor_id: String,
    pub attributes: HashMap<String, String>,
}
