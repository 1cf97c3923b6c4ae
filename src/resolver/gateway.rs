use log::{debug, info};

use crate::error::GatewayError;
use crate::gateway::{Gateway, TargetList};
use crate::types::UpstreamTargets;

/// Targets currently registered for one upstream.
///
/// Keeps the gateway's target ids around so removals can be issued
/// without a second lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ActualState {
    pub upstream: String,
    pub targets: TargetList,
}

impl ActualState {
    pub fn addresses(&self) -> Vec<String> {
        self.targets.addresses()
    }

    /// The state as a single-entry upstream map.
    pub fn upstream_targets(&self) -> UpstreamTargets {
        UpstreamTargets::from([(self.upstream.clone(), self.addresses())])
    }
}

/// Reads upstream state from the gateway.
pub struct GatewayStateResolver<'a> {
    gateway: &'a dyn Gateway,
}

impl<'a> GatewayStateResolver<'a> {
    pub fn new(gateway: &'a dyn Gateway) -> Self {
        Self { gateway }
    }

    /// Fetch the active targets of `upstream`, creating the upstream first
    /// if Kong does not know it yet.
    pub async fn resolve(&self, upstream: &str) -> Result<ActualState, GatewayError> {
        match self.gateway.get_upstream(upstream).await? {
            Some(existing) => {
                debug!("upstream={} id={} found in Kong", existing.name, existing.id)
            }
            None => {
                debug!("upstream={} not found in Kong: creating...", upstream);
                self.gateway.create_upstream(upstream).await?;
                info!("upstream={} created in Kong", upstream);
            }
        }

        let targets = self.gateway.list_active_targets(upstream).await?;
        Ok(ActualState {
            upstream: upstream.to_string(),
            targets,
        })
    }
}
