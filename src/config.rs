//! Relay configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FLOWRELAY_QUEUE_URL, FLOWRELAY_TOPIC,
//!    FLOWRELAY_ORCHESTRATOR_URL, FLOWRELAY_ORCHESTRATOR_USER,
//!    FLOWRELAY_ORCHESTRATOR_PASSWORD, FLOWRELAY_BIND)
//! 2. YAML config file (--config flag or FLOWRELAY_CONFIG)
//! 3. Defaults (local broker and orchestrator)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::OrchestratorConfig;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub queue: Option<QueueSection>,
    #[serde(default)]
    pub orchestrator: Option<OrchestratorConfig>,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub workflows: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueueSection {
    pub url: Option<String>,
    pub topic: Option<String>,
    pub poll_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub bind: Option<String>,
}

/// Queue connection settings
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub url: String,
    pub topic: String,
    pub poll_timeout_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            topic: "workflow.triggers".to_string(),
            poll_timeout_secs: 1,
        }
    }
}

/// Resolved relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub queue: QueueConfig,
    pub orchestrator: OrchestratorConfig,
    /// Ingress bind address
    pub bind: String,
    /// Workflow ids exposed by GET /workflows
    pub workflows: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            bind: "0.0.0.0:5001".to_string(),
            workflows: vec!["user_input_2sum".to_string()],
        }
    }
}

impl RelayConfig {
    /// Load configuration from all sources.
    ///
    /// `path` wins over the FLOWRELAY_CONFIG env var; env overrides are
    /// applied on top of whatever the file (or defaults) provided.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("FLOWRELAY_CONFIG").ok().map(PathBuf::from));

        let mut config = match file_path {
            Some(ref p) => Self::from_file(p)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse a YAML config file, filling gaps with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        let defaults = Self::default();

        let queue = match file.queue {
            Some(section) => QueueConfig {
                url: section.url.unwrap_or(defaults.queue.url),
                topic: section.topic.unwrap_or(defaults.queue.topic),
                poll_timeout_secs: section
                    .poll_timeout_secs
                    .unwrap_or(defaults.queue.poll_timeout_secs),
            },
            None => defaults.queue,
        };

        Ok(Self {
            queue,
            orchestrator: file.orchestrator.unwrap_or(defaults.orchestrator),
            bind: file
                .server
                .and_then(|s| s.bind)
                .unwrap_or(defaults.bind),
            workflows: file.workflows.unwrap_or(defaults.workflows),
        })
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("FLOWRELAY_QUEUE_URL") {
            self.queue.url = url;
        }
        if let Ok(topic) = std::env::var("FLOWRELAY_TOPIC") {
            self.queue.topic = topic;
        }
        if let Ok(url) = std::env::var("FLOWRELAY_ORCHESTRATOR_URL") {
            self.orchestrator.base_url = url;
        }
        if let Ok(user) = std::env::var("FLOWRELAY_ORCHESTRATOR_USER") {
            self.orchestrator.username = user;
        }
        if let Ok(password) = std::env::var("FLOWRELAY_ORCHESTRATOR_PASSWORD") {
            self.orchestrator.password = password;
        }
        if let Ok(bind) = std::env::var("FLOWRELAY_BIND") {
            self.bind = bind;
        }
    }
}
