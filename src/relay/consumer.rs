//! Background consumer loop.
//!
//! Polls the topic with a bounded wait and fans each decoded batch out into
//! serial, in-order trigger calls. The loop is the unit of fault isolation:
//! transport errors, undecodable messages, bad records, and orchestrator
//! failures are all logged and counted without terminating it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::adapters::WorkflowTrigger;
use crate::domain::{BatchTriggerRequest, TriggerConf};
use crate::transport::TopicConsumer;

use super::metrics::RelayMetrics;

/// Run the loop until a stop signal arrives.
pub(super) async fn run(
    mut consumer: Box<dyn TopicConsumer>,
    trigger: Arc<dyn WorkflowTrigger>,
    metrics: Arc<RelayMetrics>,
    poll_timeout: Duration,
    mut stop_rx: mpsc::Receiver<()>,
) {
    tracing::info!("consumer loop started on topic {}", consumer.topic());

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                tracing::info!("consumer loop stopping");
                break;
            }
            polled = consumer.poll(poll_timeout) => match polled {
                Ok(None) => continue,
                Ok(Some(payload)) => {
                    handle_message(&payload, trigger.as_ref(), &metrics).await;
                }
                Err(e) => {
                    // Transient broker errors must not kill the loop
                    tracing::warn!("consumer error: {}", e);
                    metrics.record_transport_error();
                    tokio::time::sleep(poll_timeout).await;
                }
            },
        }
    }
}

/// Decode one message and dispatch its records in input order.
async fn handle_message(
    payload: &[u8],
    trigger: &dyn WorkflowTrigger,
    metrics: &RelayMetrics,
) {
    metrics.record_message_consumed();

    let batch = match BatchTriggerRequest::from_bytes(payload) {
        Ok(batch) => batch,
        Err(e) => {
            // Malformed data will not get better by reprocessing; drop it
            tracing::warn!("dropping undecodable message: {}", e);
            metrics.record_decode_failure();
            return;
        }
    };

    for record in &batch.inputs {
        let conf = match TriggerConf::parse(record) {
            Ok(conf) => conf,
            Err(e) => {
                tracing::warn!("skipping record: {}", e);
                metrics.record_record_skipped();
                continue;
            }
        };

        match trigger.trigger(&batch.workflow_id, &conf).await {
            Ok(run) => {
                tracing::info!(
                    "triggered workflow {} with conf {:?}: run {}",
                    batch.workflow_id,
                    conf,
                    run.run_id
                );
                metrics.record_trigger_succeeded();
            }
            Err(e) => {
                tracing::warn!(
                    "failed to trigger workflow {} for record {:?}: {}",
                    batch.workflow_id,
                    record,
                    e
                );
                metrics.record_trigger_failed();
            }
        }
    }
}
