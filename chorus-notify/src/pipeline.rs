//! Post-commit side-effect pipeline
//!
//! Mutation endpoints persist their change first, then hand the resulting
//! event to this pipeline: broadcast to live subscribers, then notification
//! fan-out. Every failure past the commit is caught and logged here; the
//! request that triggered the pipeline always sees its mutation succeed.

use std::sync::Arc;

use chorus_events::{Event, EventBus};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::audience::AudienceResolver;
use crate::fanout::{FanOut, FanOutReport};
use crate::notification::NotificationKind;

/// Outcome of one pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Whether the broadcast reached the transport
    pub broadcast_ok: bool,
    /// Fan-out counters
    pub fan_out: FanOutReport,
}

/// Broadcast-then-notify pipeline invoked after a successful mutation.
#[derive(Clone)]
pub struct SideEffects {
    bus: Arc<dyn EventBus>,
    fan_out: FanOut,
}

impl SideEffects {
    /// Create a pipeline over a bus and a fan-out engine.
    pub fn new(bus: Arc<dyn EventBus>, fan_out: FanOut) -> Self {
        Self { bus, fan_out }
    }

    /// Run broadcast and fan-out sequentially in the calling task.
    ///
    /// Never returns an error: a broadcast failure is logged and fan-out
    /// still runs (durability of the record over freshness of the live
    /// view), and fan-out isolates its own failures per recipient.
    pub async fn run(
        &self,
        event: Event,
        kind: NotificationKind,
        audience: Arc<dyn AudienceResolver>,
    ) -> PipelineReport {
        let broadcast_ok = match self.bus.publish(event.clone()).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    topic = %event.topic,
                    error = %e,
                    "Broadcast failed, continuing with fan-out"
                );
                false
            }
        };

        let fan_out = self.fan_out.fan_out(&event, kind, audience.as_ref()).await;

        PipelineReport {
            broadcast_ok,
            fan_out,
        }
    }

    /// Run the pipeline in a detached task.
    ///
    /// The work runs to completion even if the originating request's
    /// connection has already closed. Callers that don't need the report
    /// drop the handle.
    pub fn spawn(
        &self,
        event: Event,
        kind: NotificationKind,
        audience: Arc<dyn AudienceResolver>,
    ) -> JoinHandle<PipelineReport> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run(event, kind, audience).await })
    }
}
