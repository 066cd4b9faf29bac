//! End-to-end relay tests.
//!
//! Drive the publisher and consumer loop over the in-memory transport and
//! record every trigger call, so ordering, partial-failure, and fault
//! isolation can be asserted without a broker or orchestrator.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use flowrelay::adapters::{OrchestratorError, WorkflowTrigger};
use flowrelay::domain::{BatchTriggerRequest, TriggerConf, TriggerRun};
use flowrelay::relay::{MetricsSnapshot, RelayMetrics, RelayService};
use flowrelay::transport::{MemoryTopic, TopicConsumer, TopicProducer, TransportError};

/// Trigger stub that records calls and optionally fails every one
struct RecordingTrigger {
    calls: Mutex<Vec<(String, TriggerConf)>>,
    fail: bool,
}

impl RecordingTrigger {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        })
    }

    fn calls(&self) -> Vec<(String, TriggerConf)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowTrigger for RecordingTrigger {
    async fn trigger(
        &self,
        workflow_id: &str,
        conf: &TriggerConf,
    ) -> Result<TriggerRun, OrchestratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((workflow_id.to_string(), conf.clone()));

        if self.fail {
            return Err(OrchestratorError::Status {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                body: "orchestrator down".to_string(),
            });
        }

        Ok(TriggerRun {
            run_id: format!("run-{}", self.calls.lock().unwrap().len()),
        })
    }
}

fn batch(workflow_id: &str, inputs: &[&str]) -> BatchTriggerRequest {
    BatchTriggerRequest {
        workflow_id: workflow_id.to_string(),
        inputs: inputs.iter().map(|s| s.to_string()).collect(),
    }
}

/// Poll metrics until the condition holds or five seconds pass
async fn wait_until(metrics: &RelayMetrics, condition: impl Fn(&MetricsSnapshot) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if condition(&metrics.snapshot()) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for relay, metrics: {:?}",
            metrics.snapshot()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn service() -> (RelayService, Box<flowrelay::transport::memory::MemoryConsumer>) {
    let (producer, consumer) = MemoryTopic::channel("test.triggers", 64);
    let service =
        RelayService::with_poll_timeout(Box::new(producer), Duration::from_millis(20));
    (service, Box::new(consumer))
}

#[tokio::test]
async fn test_batch_dispatched_in_order() {
    let (service, consumer) = service();
    let trigger = RecordingTrigger::new();
    let metrics = service.metrics();
    let handle = service.start(consumer, trigger.clone());

    service
        .publisher()
        .publish(&batch("user_input_2sum", &["1,2", "3,6", "5,10"]))
        .await
        .unwrap();

    wait_until(&metrics, |m| m.records_processed == 3).await;
    handle.stop().await.unwrap();

    let calls = trigger.calls();
    assert_eq!(calls.len(), 3);
    for (i, expected) in [("1", "2"), ("3", "6"), ("5", "10")].iter().enumerate() {
        assert_eq!(calls[i].0, "user_input_2sum");
        assert_eq!(calls[i].1.num1, expected.0);
        assert_eq!(calls[i].1.num2, expected.1);
    }

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.batches_queued, 1);
    assert_eq!(snapshot.messages_consumed, 1);
    assert_eq!(snapshot.triggers_succeeded, 3);
    assert_eq!(snapshot.triggers_failed, 0);
}

#[tokio::test]
async fn test_bad_record_skipped_siblings_survive() {
    let (service, consumer) = service();
    let trigger = RecordingTrigger::new();
    let metrics = service.metrics();
    let handle = service.start(consumer, trigger.clone());

    service
        .publisher()
        .publish(&batch("wf", &["1,2", "bad", "3,4"]))
        .await
        .unwrap();

    wait_until(&metrics, |m| m.records_processed == 3).await;
    handle.stop().await.unwrap();

    let calls = trigger.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, TriggerConf::parse("1,2").unwrap());
    assert_eq!(calls[1].1, TriggerConf::parse("3,4").unwrap());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.records_skipped, 1);
    assert_eq!(snapshot.triggers_succeeded, 2);
}

#[tokio::test]
async fn test_duplicate_delivery_triggers_twice() {
    let (service, consumer) = service();
    let trigger = RecordingTrigger::new();
    let metrics = service.metrics();
    let handle = service.start(consumer, trigger.clone());

    let request = batch("wf", &["1,2", "3,6"]);
    service.publisher().publish(&request).await.unwrap();
    service.publisher().publish(&request).await.unwrap();

    // Duplicates are tolerated, never deduplicated
    wait_until(&metrics, |m| m.records_processed == 4).await;
    handle.stop().await.unwrap();

    assert_eq!(trigger.calls().len(), 4);
    assert_eq!(metrics.snapshot().messages_consumed, 2);
}

#[tokio::test]
async fn test_undecodable_message_dropped_loop_survives() {
    let (producer, consumer) = MemoryTopic::channel("test.triggers", 64);
    let raw_producer = producer.clone();
    let service =
        RelayService::with_poll_timeout(Box::new(producer), Duration::from_millis(20));
    let trigger = RecordingTrigger::new();
    let metrics = service.metrics();
    let handle = service.start(Box::new(consumer), trigger.clone());

    // Garbage straight onto the topic, then a well-formed batch behind it
    raw_producer.send(b"not json at all".to_vec()).await.unwrap();
    service
        .publisher()
        .publish(&batch("wf", &["1,2"]))
        .await
        .unwrap();

    wait_until(&metrics, |m| m.triggers_succeeded == 1).await;
    handle.stop().await.unwrap();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.decode_failures, 1);
    assert_eq!(snapshot.messages_consumed, 2);
    assert_eq!(trigger.calls().len(), 1);
}

#[tokio::test]
async fn test_trigger_failures_do_not_abort_batch() {
    let (service, consumer) = service();
    let trigger = RecordingTrigger::failing();
    let metrics = service.metrics();
    let handle = service.start(consumer, trigger.clone());

    service
        .publisher()
        .publish(&batch("wf", &["1,2", "3,6", "5,10"]))
        .await
        .unwrap();

    wait_until(&metrics, |m| m.records_processed == 3).await;

    // The loop is still alive and processes the next batch
    service
        .publisher()
        .publish(&batch("wf", &["7,14"]))
        .await
        .unwrap();
    wait_until(&metrics, |m| m.records_processed == 4).await;
    handle.stop().await.unwrap();

    assert_eq!(trigger.calls().len(), 4);
    assert_eq!(metrics.snapshot().triggers_failed, 4);
    assert_eq!(metrics.snapshot().triggers_succeeded, 0);
}

#[tokio::test]
async fn test_whitespace_records_trimmed() {
    let (service, consumer) = service();
    let trigger = RecordingTrigger::new();
    let metrics = service.metrics();
    let handle = service.start(consumer, trigger.clone());

    service
        .publisher()
        .publish(&batch("wf", &[" 7 , 14 "]))
        .await
        .unwrap();

    wait_until(&metrics, |m| m.records_processed == 1).await;
    handle.stop().await.unwrap();

    let calls = trigger.calls();
    assert_eq!(calls[0].1.num1, "7");
    assert_eq!(calls[0].1.num2, "14");
}

/// Consumer that fails its first poll, then hands over one message
struct FlakyConsumer {
    payload: Option<Vec<u8>>,
    errored: bool,
}

#[async_trait]
impl TopicConsumer for FlakyConsumer {
    fn topic(&self) -> &str {
        "test.triggers"
    }

    async fn poll(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if !self.errored {
            self.errored = true;
            return Err(TransportError::Receive {
                topic: "test.triggers".to_string(),
                reason: "connection reset".to_string(),
            });
        }
        match self.payload.take() {
            Some(payload) => Ok(Some(payload)),
            None => {
                tokio::time::sleep(timeout).await;
                Ok(None)
            }
        }
    }
}

#[tokio::test]
async fn test_transport_error_logged_loop_continues() {
    let (producer, _consumer) = MemoryTopic::channel("test.triggers", 64);
    let service =
        RelayService::with_poll_timeout(Box::new(producer), Duration::from_millis(20));
    let trigger = RecordingTrigger::new();
    let metrics = service.metrics();

    // The message is queued behind a poll error; the loop must absorb the
    // error and still dispatch it
    let consumer = FlakyConsumer {
        payload: Some(batch("wf", &["1,2"]).to_bytes().unwrap()),
        errored: false,
    };
    let handle = service.start(Box::new(consumer), trigger.clone());

    wait_until(&metrics, |m| m.triggers_succeeded == 1).await;
    handle.stop().await.unwrap();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.transport_errors, 1);
    assert_eq!(snapshot.messages_consumed, 1);
    assert_eq!(trigger.calls().len(), 1);
}

#[tokio::test]
async fn test_stop_joins_idle_loop() {
    let (service, consumer) = service();
    let handle = service.start(consumer, RecordingTrigger::new());

    // Nothing published; stop must still return promptly
    tokio::time::timeout(Duration::from_secs(2), handle.stop())
        .await
        .expect("stop timed out")
        .unwrap();
}
