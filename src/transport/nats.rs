//! NATS-backed topic transport.
//!
//! One connection serves both halves: the producer publishes to the subject
//! and the consumer subscribes to it. The async-nats client handles its own
//! internal synchronization, so the producer can be called from concurrent
//! ingress handlers.

use std::time::Duration;

use async_nats::Client;
use async_trait::async_trait;
use futures::StreamExt;

use super::{TopicConsumer, TopicProducer, TransportError};

/// Connection factory for NATS-backed topics.
pub struct NatsTopic;

impl NatsTopic {
    /// Connect to the broker and open both halves of the topic.
    pub async fn connect(
        url: &str,
        topic: &str,
    ) -> Result<(NatsProducer, NatsConsumer), TransportError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let subscriber = client
            .subscribe(topic.to_string())
            .await
            .map_err(|e| TransportError::Receive {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!("connected to queue broker at {} (topic {})", url, topic);

        Ok((
            NatsProducer {
                client,
                topic: topic.to_string(),
            },
            NatsConsumer {
                topic: topic.to_string(),
                subscriber,
            },
        ))
    }
}

/// Producer half backed by a NATS client.
pub struct NatsProducer {
    client: Client,
    topic: String,
}

#[async_trait]
impl TopicProducer for NatsProducer {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn send(&self, payload: Vec<u8>) -> Result<(), TransportError> {
        self.client
            .publish(self.topic.clone(), payload.into())
            .await
            .map_err(|e| TransportError::Send {
                topic: self.topic.clone(),
                reason: e.to_string(),
            })
    }

    async fn flush(&self) -> Result<(), TransportError> {
        self.client
            .flush()
            .await
            .map_err(|e| TransportError::Send {
                topic: self.topic.clone(),
                reason: e.to_string(),
            })
    }
}

/// Consumer half backed by a NATS subscription.
pub struct NatsConsumer {
    topic: String,
    subscriber: async_nats::Subscriber,
}

#[async_trait]
impl TopicConsumer for NatsConsumer {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match tokio::time::timeout(timeout, self.subscriber.next()).await {
            Err(_) => Ok(None),
            Ok(Some(message)) => Ok(Some(message.payload.to_vec())),
            Ok(None) => Err(TransportError::Closed(self.topic.clone())),
        }
    }
}
