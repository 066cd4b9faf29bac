//! The relay core: publisher, consumer loop, and metrics.
//!
//! [`RelayService`] ties the pieces together: it owns the publisher side,
//! shares one [`RelayMetrics`] between the ingress handlers and the loop,
//! and spawns/stops the background consumer task.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::adapters::WorkflowTrigger;
use crate::domain::{BatchTriggerRequest, DeliveryOutcome};
use crate::transport::{TopicConsumer, TopicProducer, TransportError};

mod consumer;
mod metrics;

pub use metrics::{MetricsSnapshot, RelayMetrics};

/// Default bounded wait for one consumer poll
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Publisher side of the relay.
///
/// Turns one batch request into exactly one serialized message on the topic
/// and forces a flush so the caller's acknowledgment means the broker has
/// the message.
pub struct Publisher {
    producer: Box<dyn TopicProducer>,
    metrics: Arc<RelayMetrics>,
}

impl Publisher {
    pub fn new(producer: Box<dyn TopicProducer>, metrics: Arc<RelayMetrics>) -> Self {
        Self { producer, metrics }
    }

    /// Publish one batch to the topic.
    ///
    /// On failure the batch is dropped; the caller must retry the whole
    /// batch.
    pub async fn publish(&self, request: &BatchTriggerRequest) -> Result<(), TransportError> {
        let payload = request.to_bytes()?;

        let result = match self.producer.send(payload).await {
            Ok(()) => self.producer.flush().await,
            Err(e) => Err(e),
        };

        let outcome = DeliveryOutcome {
            topic: self.producer.topic().to_string(),
            success: result.is_ok(),
            error: result.as_ref().err().map(|e| e.to_string()),
        };

        match result {
            Ok(()) => {
                tracing::debug!("message delivered to {}", outcome.topic);
                self.metrics.record_batch_queued();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    "message delivery to {} failed: {}",
                    outcome.topic,
                    outcome.error.as_deref().unwrap_or("unknown")
                );
                self.metrics.record_publish_failure();
                Err(e)
            }
        }
    }
}

/// The relay service: injected configuration, explicit lifecycle.
pub struct RelayService {
    publisher: Arc<Publisher>,
    metrics: Arc<RelayMetrics>,
    poll_timeout: Duration,
}

impl RelayService {
    /// Create a service publishing to the given producer.
    pub fn new(producer: Box<dyn TopicProducer>) -> Self {
        Self::with_poll_timeout(producer, DEFAULT_POLL_TIMEOUT)
    }

    /// Create a service with a custom consumer poll timeout.
    pub fn with_poll_timeout(producer: Box<dyn TopicProducer>, poll_timeout: Duration) -> Self {
        let metrics = Arc::new(RelayMetrics::new());
        Self {
            publisher: Arc::new(Publisher::new(producer, metrics.clone())),
            metrics,
            poll_timeout,
        }
    }

    pub fn publisher(&self) -> Arc<Publisher> {
        self.publisher.clone()
    }

    pub fn metrics(&self) -> Arc<RelayMetrics> {
        self.metrics.clone()
    }

    /// Spawn the background consumer loop.
    ///
    /// The consumer handle moves into the task; call
    /// [`RelayHandle::stop`] to signal the loop to exit at its next poll
    /// boundary and join it.
    pub fn start(
        &self,
        consumer: Box<dyn TopicConsumer>,
        trigger: Arc<dyn WorkflowTrigger>,
    ) -> RelayHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let metrics = self.metrics.clone();
        let poll_timeout = self.poll_timeout;

        let task = tokio::spawn(async move {
            consumer::run(consumer, trigger, metrics, poll_timeout, stop_rx).await;
        });

        RelayHandle { stop_tx, task }
    }
}

/// Handle to control the consumer loop
pub struct RelayHandle {
    stop_tx: mpsc::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl RelayHandle {
    /// Stop the consumer loop and wait for it to exit
    pub async fn stop(self) -> Result<()> {
        let _ = self.stop_tx.send(()).await;
        self.task.await?;
        Ok(())
    }
}
