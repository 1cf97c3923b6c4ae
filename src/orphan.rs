use log::{debug, info};

use crate::error::SyncError;
use crate::reconciler::Reconciler;

impl Reconciler {
    /// Remove the last target of an upstream no running container backs.
    ///
    /// A full pass only visits upstreams that still have containers, so
    /// the target of the last stopped container would otherwise stay
    /// registered. Only the single-target case is handled; an upstream left
    /// with several targets is not touched. Returns the removed target.
    pub async fn cleanup_orphan(&self, upstream: &str) -> Result<Option<String>, SyncError> {
        let desired = self.containers().resolve(Some(upstream)).await?;
        if desired.get(upstream).is_some_and(|targets| !targets.is_empty()) {
            debug!("upstream={} still backed by containers", upstream);
            return Ok(None);
        }

        let active = self.gateway().list_active_targets(upstream).await?;
        let [target] = active.data.as_slice() else {
            debug!(
                "upstream={} has {} active targets: no orphan cleanup",
                upstream, active.total
            );
            return Ok(None);
        };

        info!(
            "upstream={} removing={} upstream is an orphan: cleaning...",
            upstream, target.target
        );
        self.gateway().delete_target(upstream, &target.id).await?;
        info!(
            "upstream={} removed={} upstream was an orphan: cleaned",
            upstream, target.target
        );
        Ok(Some(target.target.clone()))
    }
}
