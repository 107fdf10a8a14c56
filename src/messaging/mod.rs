//! Messaging
//!
//! Topic names, wire payloads, bus transports and the event emitter.

mod bus;
mod emitter;
pub mod kafka;
pub mod memory;
pub mod payloads;
mod topics;

pub use bus::{BusError, EventPublisher, InboundMessage, MessageSource};
pub use emitter::EventEmitter;
pub use kafka::{KafkaConsumer, KafkaPublisher};
pub use memory::{InMemoryPublisher, InMemorySource, PublishedMessage};
pub use payloads::{DecodeError, InboundEvent, OutboundEvent};
pub use topics::{RequestKind, ResponseKind, Topics};
