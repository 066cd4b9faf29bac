//! flowrelay - queue-backed batch trigger relay
//!
//! Accepts batches of `"num1,num2"` records over HTTP, publishes each batch
//! as one message on a durable topic, and consumes the topic on a background
//! loop that turns every record into an individual run-creation call against
//! an external workflow orchestrator.
//!
//! # Architecture
//!
//! ```text
//! POST /trigger → Publisher → topic → Consumer Loop → OrchestratorClient
//!                                          ↓
//!                                    RelayMetrics → GET /metrics
//! ```
//!
//! # Modules
//!
//! - `transport`: topic producer/consumer traits (NATS and in-memory impls)
//! - `relay`: publisher, consumer loop, metrics counters
//! - `adapters`: external workflow orchestrator client
//! - `server`: HTTP ingress (trigger, metrics, workflow discovery)
//! - `bench`: load-generation harness
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the relay (ingress + consumer loop)
//! flowrelay serve
//!
//! # Benchmark a running relay
//! flowrelay bench --total-pairs 1000 --batch-size 50
//! ```

pub mod adapters;
pub mod bench;
pub mod cli;
pub mod config;
pub mod domain;
pub mod relay;
pub mod server;
pub mod transport;

// Re-export main types at crate root for convenience
pub use adapters::{OrchestratorClient, OrchestratorError, WorkflowTrigger};
pub use domain::{BatchTriggerRequest, RecordParseError, TriggerConf, TriggerRun};
pub use relay::{MetricsSnapshot, Publisher, RelayHandle, RelayMetrics, RelayService};
pub use transport::{TopicConsumer, TopicProducer, TransportError};
