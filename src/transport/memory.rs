//! In-process topic transport.
//!
//! A bounded tokio channel standing in for the broker. Used by the test
//! suite and useful for running the relay without a broker at hand.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{TopicConsumer, TopicProducer, TransportError};

/// Channel factory for in-process topics.
pub struct MemoryTopic;

impl MemoryTopic {
    /// Open both halves of an in-process topic.
    pub fn channel(topic: &str, capacity: usize) -> (MemoryProducer, MemoryConsumer) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            MemoryProducer {
                topic: topic.to_string(),
                tx,
            },
            MemoryConsumer {
                topic: topic.to_string(),
                rx,
            },
        )
    }
}

/// Producer half of an in-process topic.
#[derive(Clone)]
pub struct MemoryProducer {
    topic: String,
    tx: mpsc::Sender<Vec<u8>>,
}

#[async_trait]
impl TopicProducer for MemoryProducer {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| TransportError::Closed(self.topic.clone()))
    }

    async fn flush(&self) -> Result<(), TransportError> {
        // Channel sends are synchronous with respect to the receiver
        Ok(())
    }
}

/// Consumer half of an in-process topic.
pub struct MemoryConsumer {
    topic: String,
    rx: mpsc::Receiver<Vec<u8>>,
}

#[async_trait]
impl TopicConsumer for MemoryConsumer {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(payload)) => Ok(Some(payload)),
            Ok(None) => Err(TransportError::Closed(self.topic.clone())),
        }
    }
}
