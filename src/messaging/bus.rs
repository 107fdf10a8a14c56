//! Bus abstractions
//!
//! The dispatcher reads through a [`MessageSource`] and the emitter writes
//! through an [`EventPublisher`]. Kafka and in-memory transports implement
//! both, so the whole pipeline runs in tests without a broker.

use async_trait::async_trait;

/// Errors raised by a bus transport
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("Broker connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Publish to '{topic}' failed: {reason}")]
    PublishFailed { topic: String, reason: String },

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Offset commit failed: {0}")]
    CommitFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One raw message as delivered by the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Option<Vec<u8>>,
    pub partition: Option<i32>,
    pub offset: Option<i64>,
}

impl InboundMessage {
    /// A message with no broker position, e.g. for tests
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: Some(payload.into()),
            partition: None,
            offset: None,
        }
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }
}

/// Publishes raw payloads to a topic.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BusError>;
}

/// Yields inbound messages one at a time.
#[async_trait]
pub trait MessageSource: Send {
    /// Wait up to the poll interval for the next message.
    ///
    /// Returns `Ok(None)` when nothing arrived in time.
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, BusError>;

    /// Mark a message as fully processed.
    async fn ack(&mut self, message: &InboundMessage) -> Result<(), BusError>;
}
