//! Event Emitter
//!
//! Publishes outbound events after the unit of work has committed. Delivery
//! is best-effort: there is no retry, and a failure is logged and swallowed
//! so it can never undo or block the settled ledger change.

use std::sync::Arc;

use super::bus::{BusError, EventPublisher};
use super::payloads::OutboundEvent;
use super::topics::Topics;

/// Fire-and-forget publisher of [`OutboundEvent`]s
#[derive(Clone)]
pub struct EventEmitter {
    publisher: Arc<dyn EventPublisher>,
    topics: Topics,
}

impl EventEmitter {
    pub fn new(publisher: Arc<dyn EventPublisher>, topics: Topics) -> Self {
        Self { publisher, topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// Publish `event`, logging instead of returning any failure.
    ///
    /// Returns whether the broker accepted the event.
    pub async fn emit(&self, event: &OutboundEvent) -> bool {
        match self.try_emit(event).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    topic = event.topic(&self.topics),
                    target = event.target_service(),
                    error = %e,
                    "Failed to publish outbound event"
                );
                false
            }
        }
    }

    async fn try_emit(&self, event: &OutboundEvent) -> Result<(), BusError> {
        let topic = event.topic(&self.topics);
        let payload = event.to_payload()?;

        tracing::info!(
            topic,
            target = event.target_service(),
            key = %event.key(),
            "Sending event"
        );

        self.publisher.publish(topic, &event.key(), &payload).await
    }
}
