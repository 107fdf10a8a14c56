//! Message Context
//!
//! Metadata about the inbound message being processed, used for tracing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Context for one inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContext {
    /// Generated per message so every log line of one unit of work correlates
    pub message_id: Uuid,

    /// Topic the message arrived on
    pub topic: String,

    /// Broker partition, when the transport has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition: Option<i32>,

    /// Broker offset, when the transport has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    pub received_at: DateTime<Utc>,
}

impl MessageContext {
    /// Create a context for a message on `topic`
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            topic: topic.into(),
            partition: None,
            offset: None,
            received_at: Utc::now(),
        }
    }

    /// Attach the broker position of the message
    pub fn with_position(mut self, partition: i32, offset: i64) -> Self {
        self.partition = Some(partition);
        self.offset = Some(offset);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let context = MessageContext::new("shop.balance.reserve.request.auth").with_position(2, 41);

        assert_eq!(context.topic, "shop.balance.reserve.request.auth");
        assert_eq!(context.partition, Some(2));
        assert_eq!(context.offset, Some(41));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let a = MessageContext::new("t");
        let b = MessageContext::new("t");
        assert_ne!(a.message_id, b.message_id);
    }
}
