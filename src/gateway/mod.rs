//! Kong admin API vocabulary and the [`Gateway`] seam used by the
//! reconciler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub mod kong;
pub use kong::KongClient;

/// Node information returned by `GET /`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeInformation {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpstreamRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Upstream {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetRequest<'a> {
    pub target: &'a str,
    pub weight: u32,
}

/// A target registered under an upstream.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Target {
    pub id: String,
    pub target: String,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub upstream_id: Option<String>,
}

/// Active targets of an upstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetList {
    pub total: u64,
    pub data: Vec<Target>,
}

impl TargetList {
    /// Target addresses, in gateway order.
    pub fn addresses(&self) -> Vec<String> {
        self.data.iter().map(|t| t.target.clone()).collect()
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// Connectivity check.
    async fn node_information(&self) -> Result<NodeInformation, GatewayError>;

    /// Look up an upstream by name. `Ok(None)` when it does not exist.
    async fn get_upstream(&self, name: &str) -> Result<Option<Upstream>, GatewayError>;

    async fn create_upstream(&self, name: &str) -> Result<(), GatewayError>;

    async fn list_active_targets(&self, upstream: &str) -> Result<TargetList, GatewayError>;

    async fn add_target(
        &self,
        upstream: &str,
        target: &str,
        weight: u32,
    ) -> Result<Target, GatewayError>;

    /// Delete a target by id. A target that is already gone is not an error.
    async fn delete_target(&self, upstream: &str, id: &str) -> Result<(), GatewayError>;
}
