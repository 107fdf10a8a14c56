//! Kafka transport
//!
//! `rdkafka` clients behind the bus traits. Offsets are committed manually
//! after the dispatcher has finished a message, which gives at-least-once
//! delivery; the ledger's transaction-id lookup turns that into
//! effectively-once balance mutation.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::{Offset, TopicPartitionList};
use std::time::Duration;

use crate::config::KafkaConfig;

use super::bus::{BusError, EventPublisher, InboundMessage, MessageSource};

/// Producer half
pub struct KafkaPublisher {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaPublisher {
    /// # Errors
    /// - `BusError::ConnectionFailed` if the producer cannot be created
    pub fn new(config: &KafkaConfig) -> Result<Self, BusError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("message.timeout.ms", config.publish_timeout.as_millis().to_string())
            .set("acks", "1")
            .create()
            .map_err(|e| BusError::ConnectionFailed(format!("Failed to create producer: {e}")))?;

        tracing::info!(brokers = %config.brokers, "Kafka producer created");

        Ok(Self {
            producer,
            timeout: config.publish_timeout,
        })
    }
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, topic: &str, key: &str, payload: &[u8]) -> Result<(), BusError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(self.timeout)).await {
            Ok((partition, offset)) => {
                tracing::debug!(topic, partition, offset, "Event published");
                Ok(())
            }
            Err((kafka_error, _)) => Err(BusError::PublishFailed {
                topic: topic.to_string(),
                reason: kafka_error.to_string(),
            }),
        }
    }
}

/// Consumer half
pub struct KafkaConsumer {
    consumer: StreamConsumer,
    poll_interval: Duration,
}

impl KafkaConsumer {
    /// Create the consumer and subscribe it to `topics`.
    ///
    /// # Errors
    /// - `BusError::ConnectionFailed` if the consumer cannot be created or
    ///   subscribed
    pub fn new(config: &KafkaConfig, topics: &[&str]) -> Result<Self, BusError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", &config.auto_offset_reset)
            .set("session.timeout.ms", "6000")
            .set("enable.partition.eof", "false")
            .create()
            .map_err(|e| BusError::ConnectionFailed(format!("Failed to create consumer: {e}")))?;

        consumer
            .subscribe(topics)
            .map_err(|e| BusError::ConnectionFailed(format!("Failed to subscribe: {e}")))?;

        tracing::info!(
            brokers = %config.brokers,
            group_id = %config.group_id,
            auto_offset_reset = %config.auto_offset_reset,
            ?topics,
            "Kafka consumer subscribed"
        );

        Ok(Self {
            consumer,
            poll_interval: config.poll_interval,
        })
    }
}

#[async_trait]
impl MessageSource for KafkaConsumer {
    async fn next_message(&mut self) -> Result<Option<InboundMessage>, BusError> {
        let received = tokio::time::timeout(self.poll_interval, self.consumer.recv()).await;

        match received {
            Err(_elapsed) => Ok(None),
            Ok(Err(e)) => Err(BusError::ReceiveFailed(e.to_string())),
            Ok(Ok(message)) => Ok(Some(InboundMessage {
                topic: message.topic().to_string(),
                payload: message.payload().map(<[u8]>::to_vec),
                partition: Some(message.partition()),
                offset: Some(message.offset()),
            })),
        }
    }

    async fn ack(&mut self, message: &InboundMessage) -> Result<(), BusError> {
        let (Some(partition), Some(offset)) = (message.partition, message.offset) else {
            return Ok(());
        };

        // The committed offset is the next one to read.
        let mut positions = TopicPartitionList::new();
        positions
            .add_partition_offset(&message.topic, partition, Offset::Offset(offset + 1))
            .map_err(|e| BusError::CommitFailed(e.to_string()))?;

        self.consumer
            .commit(&positions, CommitMode::Async)
            .map_err(|e| BusError::CommitFailed(e.to_string()))
    }
}
