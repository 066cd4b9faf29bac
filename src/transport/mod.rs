//! Topic transport abstraction.
//!
//! The relay only needs two capabilities from the queue broker: send one
//! opaque payload to a named topic, and poll the topic with a bounded wait.
//! Both sides are single-owner handles: the [`Publisher`](crate::relay::Publisher)
//! owns the producer, the consumer loop owns the consumer. Durability and
//! at-least-once delivery are the broker's contract, not enforced here.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod nats;

pub use memory::MemoryTopic;
pub use nats::NatsTopic;

/// Errors from the queue transport
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to queue broker: {0}")]
    Connect(String),

    #[error("failed to publish to topic {topic}: {reason}")]
    Send { topic: String, reason: String },

    #[error("failed to poll topic {topic}: {reason}")]
    Receive { topic: String, reason: String },

    #[error("topic {0} is closed")]
    Closed(String),

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Producer half of a topic.
#[async_trait]
pub trait TopicProducer: Send + Sync {
    /// Topic this producer writes to
    fn topic(&self) -> &str;

    /// Send one payload to the topic
    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError>;

    /// Flush any buffered sends. Called after every publish to bound
    /// delivery latency at the cost of batching efficiency.
    async fn flush(&self) -> Result<(), TransportError>;
}

/// Consumer half of a topic.
#[async_trait]
pub trait TopicConsumer: Send {
    /// Topic this consumer reads from
    fn topic(&self) -> &str;

    /// Wait up to `timeout` for the next message. `Ok(None)` means nothing
    /// arrived in time and the caller should just poll again.
    async fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError>;
}
