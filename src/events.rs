//! Docker event listener.
//!
//! Events are handled one at a time in arrival order: each relevant event
//! triggers a full synchronization pass that runs to completion before the
//! next event is read.

use std::time::Duration;

use futures_util::stream::StreamExt;
use log::{debug, error, info, warn};
use tokio::time::sleep;

use crate::error::RuntimeError;
use crate::reconciler::Reconciler;
use crate::types::RuntimeEvent;

/// Delay before subscribing again once the runtime closed the stream.
const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(2);

/// True for container `start`/`die` events carrying the upstream label.
pub fn should_process_event(event: &RuntimeEvent, label: &str) -> bool {
    event.kind == "container"
        && matches!(event.action.as_str(), "start" | "die")
        && event.attributes.contains_key(label)
}

pub struct EventListener {
    reconciler: Reconciler,
}

impl EventListener {
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }

    /// Consume runtime events until the stream reports an error.
    ///
    /// Events emitted while no subscription was active are lost, so every
    /// resubscription is followed by a full pass.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        let mut resubscribed = false;
        loop {
            let mut stream = self.reconciler.runtime().events();
            info!("Listening for Docker events...");

            if resubscribed {
                self.resynchronize().await;
            }

            while let Some(msg) = stream.next().await {
                let event = msg?;
                self.handle_event(&event).await;
            }

            warn!(
                "Docker event stream ended. Resubscribing in {}s...",
                RESUBSCRIBE_DELAY.as_secs()
            );
            sleep(RESUBSCRIBE_DELAY).await;
            resubscribed = true;
        }
    }

    async fn resynchronize(&self) {
        match self.reconciler.synchronize().await {
            Ok(report) => debug!(
                "resynchronized {} upstream(s) after resubscribing, {} failed",
                report.upstreams.len(),
                report.failed.len()
            ),
            Err(e) => error!("unable to synchronize after resubscribing: {}", e),
        }
    }

    /// Handle one event. Returns whether it triggered a synchronization.
    pub async fn handle_event(&self, event: &RuntimeEvent) -> bool {
        let label = self.reconciler.label();
        if !should_process_event(event, label) {
            return false;
        }
        let upstream = event.attributes[label].as_str();
        debug!(
            "container={} action={} upstream={} event received",
            event.actor_id, event.action, upstream
        );

        if let Err(e) = self.reconciler.synchronize().await {
            error!("upstream={} upstream synchronization error: {}", upstream, e);
            return true;
        }
        if event.action == "die" {
            if let Err(e) = self.reconciler.cleanup_orphan(upstream).await {
                error!("upstream={} unable to clean orphan upstream: {}", upstream, e);
            }
        }
        true
    }
}
