//! Upstream synchronization.
//!
//! A pass compares, for every upstream that has at least one running
//! container, the targets derived from the containers with the targets
//! registered in Kong and applies the difference: stale targets are
//! removed first, then missing ones are registered. A failure on one
//! upstream is logged and the pass moves on to the next one.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, error, info};

use crate::diff::diff;
use crate::error::{GatewayError, SyncError};
use crate::gateway::{Gateway, TargetList};
use crate::resolver::{ContainerTargetResolver, GatewayStateResolver};
use crate::runtime::ContainerRuntime;

/// Targets created and removed on one upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamChanges {
    pub created: Vec<String>,
    pub removed: Vec<String>,
}

impl UpstreamChanges {
    /// Changes turning `actual` into `desired`.
    pub fn plan(actual: &[String], desired: &[String]) -> Self {
        Self {
            created: diff(desired, actual),
            removed: diff(actual, desired),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

/// Outcome of a full synchronization pass.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub upstreams: BTreeMap<String, UpstreamChanges>,
    pub failed: Vec<String>,
}

pub struct Reconciler {
    runtime: Arc<dyn ContainerRuntime>,
    gateway: Arc<dyn Gateway>,
    label: String,
    weight: u32,
}

impl Reconciler {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        gateway: Arc<dyn Gateway>,
        label: impl Into<String>,
        weight: u32,
    ) -> Self {
        Self {
            runtime,
            gateway,
            label: label.into(),
            weight,
        }
    }

    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    pub fn gateway(&self) -> &dyn Gateway {
        self.gateway.as_ref()
    }

    /// Label carrying the upstream name.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn containers(&self) -> ContainerTargetResolver<'_> {
        ContainerTargetResolver::new(self.runtime(), &self.label)
    }

    pub fn gateway_state(&self) -> GatewayStateResolver<'_> {
        GatewayStateResolver::new(self.gateway())
    }

    /// Synchronize every upstream that has running containers.
    ///
    /// Only a failure to list the containers fails the pass.
    pub async fn synchronize(&self) -> Result<SyncReport, SyncError> {
        let desired = self.containers().resolve(None).await?;
        debug!("docker upstream configuration: {:?}", desired);

        let mut report = SyncReport::default();
        for (upstream, targets) in &desired {
            match self.synchronize_upstream(upstream, targets).await {
                Ok(changes) => {
                    if changes.is_empty() {
                        debug!("upstream={} already synchronized", upstream);
                    } else {
                        info!(
                            "upstream={} configuration synchronized: created={:?} removed={:?}",
                            upstream, changes.created, changes.removed
                        );
                    }
                    report.upstreams.insert(upstream.clone(), changes);
                }
                Err(e) => {
                    error!("upstream={} unable to synchronize: {}", upstream, e);
                    report.failed.push(upstream.clone());
                }
            }
        }
        Ok(report)
    }

    /// Bring the Kong targets of `upstream` in line with `desired`.
    pub async fn synchronize_upstream(
        &self,
        upstream: &str,
        desired: &[String],
    ) -> Result<UpstreamChanges, SyncError> {
        let actual = self.gateway_state().resolve(upstream).await?;
        debug!("kong upstream configuration: {:?}", actual.upstream_targets());

        let changes = UpstreamChanges::plan(&actual.addresses(), desired);
        self.unregister_targets(upstream, &actual.targets, &changes.removed)
            .await?;
        self.register_targets(upstream, &changes.created).await?;
        Ok(changes)
    }

    /// Delete `targets` from `upstream`, resolving each address to the id of
    /// a not yet deleted entry of `active`.
    async fn unregister_targets(
        &self,
        upstream: &str,
        active: &TargetList,
        targets: &[String],
    ) -> Result<(), GatewayError> {
        if targets.is_empty() {
            return Ok(());
        }
        debug!("upstream={} un-registering targets {:?}", upstream, targets);

        let mut remaining: Vec<_> = active.data.iter().collect();
        for target in targets {
            let Some(pos) = remaining.iter().position(|t| &t.target == target) else {
                continue;
            };
            let entry = remaining.remove(pos);
            self.gateway.delete_target(upstream, &entry.id).await?;
            debug!(
                "upstream={} target={} id={} un-registered",
                upstream, target, entry.id
            );
        }
        Ok(())
    }

    async fn register_targets(&self, upstream: &str, targets: &[String]) -> Result<(), GatewayError> {
        if targets.is_empty() {
            return Ok(());
        }
        debug!("upstream={} registering targets {:?}", upstream, targets);

        for target in targets {
            let created = self.gateway.add_target(upstream, target, self.weight).await?;
            debug!(
                "upstream={} upstream_id={} target={} id={} weight={} registered",
                upstream,
                created.upstream_id.as_deref().unwrap_or("-"),
                created.target,
                created.id,
                created.weight
            );
        }
        Ok(())
    }
}
