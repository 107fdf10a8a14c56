//! In-memory bus, for tests and local runs without a broker.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::bus::{BusError, EventPublisher, InboundMessage, MessageSource};

/// A message captured by [`InMemoryPublisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub payload: Vec<u8>,
}

impl PublishedMessage {
    /// Decode the payload as JSON
    ///
    /// # Errors
    /// - `serde_json::Error` if the payload is not valid JSON for `T`
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Records every publish. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    published: Arc<Mutex<Vec<PublishedMessage>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all successful publishes, oldest first
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    pub fn published_to(&self, topic: &str) -> Vec<PublishedMessage> {
        self.published()
            .into_iter()
            .filter(|m| m.topic == topic)
            .collect()
    }

    /// Make every publish fail until reset
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BusError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BusError::PublishFailed {
                topic: topic.to_string(),
                reason: "publisher set to fail".to_string(),
            });
        }

        let mut log = self
            .published
            .lock()
            .map_err(|e| BusError::PublishFailed {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        log.push(PublishedMessage {
            topic: topic.to_string(),
            key: key.to_string(),
            payload: payload.to_vec(),
        });

        Ok(())
    }
}

/// Serves queued messages in order, then reports an empty poll.
#[derive(Debug, Default)]
pub struct InMemorySource {
    queue: VecDeque<InboundMessage>,
    acked: Vec<InboundMessage>,
}

impl InMemorySource {
    pub fn new(messages: impl IntoIterator<Item = InboundMessage>) -> Self {
        Self {
            queue: messages.into_iter().collect(),
            acked: Vec::new(),
        }
    }

    pub fn push(&mut self, message: InboundMessage) {
        self.queue.push_back(message);
    }

    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn acked(&self) -> &[InboundMessage] {
        &self.acked
    }
}

#[async_trait]
impl MessageSource for InMemorySource {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, BusError> {
        Ok(self.queue.pop_front())
    }

    async fn ack(&mut self, message: &InboundMessage) -> Result<(), BusError> {
        self.acked.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publisher_records_and_fails_on_demand() {
        let publisher = InMemoryPublisher::new();
        publisher.publish("t", "1", b"{}").await.unwrap();

        publisher.set_failing(true);
        assert!(publisher.publish("t", "1", b"{}").await.is_err());

        assert_eq!(publisher.published().len(), 1);
        assert_eq!(publisher.published_to("t")[0].key, "1");
        assert!(publisher.published_to("other").is_empty());
    }

    #[tokio::test]
    async fn test_source_serves_in_order() {
        let mut source = InMemorySource::new([
            InboundMessage::new("a", b"1".to_vec()),
            InboundMessage::new("b", b"2".to_vec()),
        ]);

        let first = source.next_message().await.unwrap().unwrap();
        assert_eq!(first.topic, "a");
        source.ack(&first).await.unwrap();

        assert_eq!(source.next_message().await.unwrap().unwrap().topic, "b");
        assert!(source.next_message().await.unwrap().is_none());
        assert!(source.is_drained());
        assert_eq!(source.acked().len(), 1);
    }
}
