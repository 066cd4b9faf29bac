//! Command-line interface for flowrelay.
//!
//! Provides commands for running the relay service, benchmarking a running
//! relay, and inspecting resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::OrchestratorClient;
use crate::bench::{BenchConfig, Benchmarker};
use crate::config::RelayConfig;
use crate::relay::RelayService;
use crate::server::{self, AppState};
use crate::transport::NatsTopic;

/// flowrelay - queue-backed batch trigger relay
#[derive(Parser, Debug)]
#[command(name = "flowrelay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay (HTTP ingress + background consumer loop)
    Serve {
        /// Config file path (YAML)
        #[arg(short, long, env = "FLOWRELAY_CONFIG")]
        config: Option<PathBuf>,

        /// Override the ingress bind address
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Benchmark a running relay
    Bench {
        /// Relay base URL
        #[arg(long, default_value = "http://localhost:5001")]
        base_url: String,

        /// Workflow to trigger
        #[arg(long, default_value = "user_input_2sum")]
        workflow: String,

        /// Number of pairs to generate
        #[arg(long, default_value_t = 1000)]
        total_pairs: usize,

        /// Records per batch
        #[arg(long, default_value_t = 50)]
        batch_size: usize,

        /// Seconds to wait for the relay to drain
        #[arg(long, default_value_t = 60)]
        drain_timeout: u64,

        /// Directory for the report file
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },

    /// Show resolved configuration (debug)
    Config {
        /// Config file path (YAML)
        #[arg(short, long, env = "FLOWRELAY_CONFIG")]
        config: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve { config, bind } => serve(config, bind).await,

            Commands::Bench {
                base_url,
                workflow,
                total_pairs,
                batch_size,
                drain_timeout,
                output,
            } => {
                let benchmarker = Benchmarker::new(BenchConfig {
                    base_url,
                    workflow_id: workflow,
                    total_pairs,
                    batch_size,
                    drain_timeout: Duration::from_secs(drain_timeout),
                    output_dir: output,
                });
                benchmarker.run().await?;
                Ok(())
            }

            Commands::Config { config } => {
                let resolved = RelayConfig::load(config.as_deref())?;
                println!("{:#?}", resolved);
                Ok(())
            }
        }
    }
}

/// Wire the transport, orchestrator client, relay service, and ingress
async fn serve(config_path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let mut config = RelayConfig::load(config_path.as_deref())?;
    if let Some(bind) = bind {
        config.bind = bind;
    }

    let (producer, consumer) = NatsTopic::connect(&config.queue.url, &config.queue.topic)
        .await
        .context("failed to open queue transport")?;

    let trigger = Arc::new(
        OrchestratorClient::from_config(&config.orchestrator)
            .context("failed to build orchestrator client")?,
    );

    let service = RelayService::with_poll_timeout(
        Box::new(producer),
        Duration::from_secs(config.queue.poll_timeout_secs),
    );
    let handle = service.start(Box::new(consumer), trigger);

    let state = AppState {
        publisher: service.publisher(),
        metrics: service.metrics(),
        workflows: config.workflows.clone(),
    };

    let result = server::serve(&config.bind, state).await;

    // Stop the loop at its next poll boundary before reporting the outcome
    handle.stop().await?;
    result
}
