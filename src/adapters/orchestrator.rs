//! Workflow orchestrator API client.
//!
//! Creates runs against the orchestrator's run-creation endpoint:
//! `POST {base}/workflows/{workflow_id}/runs` with basic auth and a
//! `{"conf": {...}}` body. Failures are surfaced as [`OrchestratorError`]
//! and handled at the call site; they never abort the consumer loop.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::domain::{TriggerConf, TriggerRun};

/// Errors from the orchestrator API
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("workflow API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("workflow API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Anything that can create a workflow run from a trigger conf.
///
/// The consumer loop dispatches through this trait so tests can record
/// calls without a live orchestrator.
#[async_trait]
pub trait WorkflowTrigger: Send + Sync {
    async fn trigger(
        &self,
        workflow_id: &str,
        conf: &TriggerConf,
    ) -> Result<TriggerRun, OrchestratorError>;
}

/// Configuration for the orchestrator client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// API base URL, e.g. `http://localhost:8080/api/v1`
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Hard deadline per trigger call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            username: "airflow".to_string(),
            password: "airflow".to_string(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// HTTP client for the workflow orchestrator
pub struct OrchestratorClient {
    base_url: String,
    username: String,
    password: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    conf: &'a TriggerConf,
}

impl OrchestratorClient {
    /// Create a new client
    pub fn new(
        base_url: String,
        username: String,
        password: String,
        timeout: Duration,
    ) -> Result<Self, OrchestratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            username,
            password,
            client,
        })
    }

    /// Create from config
    pub fn from_config(config: &OrchestratorConfig) -> Result<Self, OrchestratorError> {
        Self::new(
            config.base_url.clone(),
            config.username.clone(),
            config.password.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Build the run-creation URL for a workflow
    fn run_url(&self, workflow_id: &str) -> String {
        format!(
            "{}/workflows/{}/runs",
            self.base_url.trim_end_matches('/'),
            workflow_id
        )
    }
}

#[async_trait]
impl WorkflowTrigger for OrchestratorClient {
    async fn trigger(
        &self,
        workflow_id: &str,
        conf: &TriggerConf,
    ) -> Result<TriggerRun, OrchestratorError> {
        let url = self.run_url(workflow_id);
        tracing::debug!("triggering {} with conf {:?}", url, conf);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&RunRequest { conf })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OrchestratorError::Status { status, body });
        }

        let run: TriggerRun = response.json().await?;
        Ok(run)
    }
}
