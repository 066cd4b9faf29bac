//! Load-generation harness.
//!
//! Generates synthetic `"i,i*2"` pairs, sends them to a running relay's
//! `/trigger` endpoint in fixed-size batches, waits for the relay to drain
//! by polling `/metrics` (no wall-clock guessing), and persists a
//! timestamped JSON report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::BatchTriggerRequest;

/// Harness settings
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Relay base URL, e.g. `http://localhost:5001`
    pub base_url: String,
    /// Workflow to trigger
    pub workflow_id: String,
    pub total_pairs: usize,
    pub batch_size: usize,
    /// Give up waiting for drain after this long
    pub drain_timeout: Duration,
    /// Directory the report file is written to
    pub output_dir: PathBuf,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".to_string(),
            workflow_id: "user_input_2sum".to_string(),
            total_pairs: 1000,
            batch_size: 50,
            drain_timeout: Duration::from_secs(60),
            output_dir: PathBuf::from("."),
        }
    }
}

/// Persisted report: harness settings plus the relay's own metrics
#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub benchmark_config: ReportConfig,
    pub server_metrics: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ReportConfig {
    pub total_pairs: usize,
    pub batch_size: usize,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// Generate test records: record i is `"i,i*2"` for i in 1..=total
pub fn generate_pairs(total: usize) -> Vec<String> {
    (1..=total).map(|i| format!("{},{}", i, i * 2)).collect()
}

/// Chunk records into batches of at most `batch_size`
pub fn into_batches(pairs: Vec<String>, batch_size: usize) -> Vec<Vec<String>> {
    pairs
        .chunks(batch_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Benchmark client against a running relay
pub struct Benchmarker {
    config: BenchConfig,
    client: reqwest::Client,
}

impl Benchmarker {
    pub fn new(config: BenchConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Send one batch to the trigger endpoint
    async fn send_batch(&self, inputs: Vec<String>, batch_number: usize) -> Result<()> {
        let request = BatchTriggerRequest {
            workflow_id: self.config.workflow_id.clone(),
            inputs,
        };

        let response = self
            .client
            .post(format!("{}/trigger", self.config.base_url))
            .json(&request)
            .send()
            .await
            .with_context(|| format!("failed to send batch {}", batch_number))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("batch {} rejected with {}: {}", batch_number, status, body);
        }

        Ok(())
    }

    /// Fetch the relay's current metrics
    async fn fetch_metrics(&self) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/metrics", self.config.base_url))
            .send()
            .await
            .context("failed to fetch metrics")?;

        response.json().await.context("metrics response was not JSON")
    }

    /// Poll metrics until the counter reaches `target_records`.
    ///
    /// The target is absolute: callers add this run's record count to the
    /// baseline observed before sending, so earlier runs against the same
    /// relay don't count as drained.
    ///
    /// Returns the last metrics snapshot either way; on timeout the report
    /// simply records whatever the relay had processed by then.
    async fn wait_for_drain(&self, target_records: u64) -> Result<serde_json::Value> {
        let deadline = tokio::time::Instant::now() + self.config.drain_timeout;
        let mut metrics = self.fetch_metrics().await?;

        loop {
            let processed = records_processed(&metrics);

            if processed >= target_records {
                return Ok(metrics);
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(
                    "drain timeout: {}/{} records processed",
                    processed,
                    target_records
                );
                return Ok(metrics);
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
            metrics = self.fetch_metrics().await?;
        }
    }

    /// Run the complete benchmark and write the report file.
    pub async fn run(&self) -> Result<PathBuf> {
        let batches = into_batches(generate_pairs(self.config.total_pairs), self.config.batch_size);

        tracing::info!(
            "starting benchmark: {} pairs in {} batches of up to {}",
            self.config.total_pairs,
            batches.len(),
            self.config.batch_size
        );

        // The relay's counters are process-wide; snapshot them first so a
        // relay that already processed records (an earlier run) still has
        // to drain this run's records before we read the final metrics.
        let baseline = records_processed(&self.fetch_metrics().await?);

        let start_time = Utc::now();

        for (i, batch) in batches.into_iter().enumerate() {
            self.send_batch(batch, i + 1).await?;
        }

        let end_time = Utc::now();
        let duration_seconds = (end_time - start_time)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();

        tracing::info!("all batches sent, waiting for the relay to drain");
        let server_metrics = self
            .wait_for_drain(baseline + self.config.total_pairs as u64)
            .await?;

        let report = BenchReport {
            benchmark_config: ReportConfig {
                total_pairs: self.config.total_pairs,
                batch_size: self.config.batch_size,
                start_time,
                end_time,
                duration_seconds,
            },
            server_metrics,
        };

        let path = self.save_report(&report)?;

        tracing::info!(
            "benchmark complete: {} pairs in {:.2}s ({:.2} pairs/second), report at {}",
            self.config.total_pairs,
            duration_seconds,
            self.config.total_pairs as f64 / duration_seconds.max(f64::EPSILON),
            path.display()
        );

        Ok(path)
    }

    /// Write the report to a timestamped file in the output directory
    fn save_report(&self, report: &BenchReport) -> Result<PathBuf> {
        save_report_to(&self.config.output_dir, report)
    }
}

/// Read the `records_processed` counter out of a metrics response
fn records_processed(metrics: &serde_json::Value) -> u64 {
    metrics
        .get("records_processed")
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

/// Write a report as `benchmark_results_{timestamp}.json` under `dir`
pub fn save_report_to(dir: &Path, report: &BenchReport) -> Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("benchmark_results_{}.json", timestamp));

    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    std::fs::write(&path, json)
        .with_context(|| format!("failed to write report: {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generate_pairs() {
        let pairs = generate_pairs(5);
        assert_eq!(pairs, vec!["1,2", "2,4", "3,6", "4,8", "5,10"]);
    }

    #[test]
    fn test_hundred_pairs_ten_batches() {
        let batches = into_batches(generate_pairs(100), 10);

        assert_eq!(batches.len(), 10);
        for batch in &batches {
            assert_eq!(batch.len(), 10);
        }
        // Record i is "i,i*2"
        assert_eq!(batches[0][0], "1,2");
        assert_eq!(batches[9][9], "100,200");
    }

    #[test]
    fn test_uneven_final_batch() {
        let batches = into_batches(generate_pairs(7), 3);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2], vec!["7,14"]);
    }

    #[test]
    fn test_save_report() {
        let temp = TempDir::new().unwrap();
        let now = Utc::now();

        let report = BenchReport {
            benchmark_config: ReportConfig {
                total_pairs: 10,
                batch_size: 5,
                start_time: now,
                end_time: now,
                duration_seconds: 0.0,
            },
            server_metrics: serde_json::json!({ "records_processed": 10 }),
        };

        let path = save_report_to(temp.path(), &report).unwrap();
        assert!(path.exists());

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["benchmark_config"]["total_pairs"], 10);
        assert_eq!(written["server_metrics"]["records_processed"], 10);
    }
}
