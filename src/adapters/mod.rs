//! External system integrations.
//!
//! The only external collaborator the relay talks to directly is the
//! workflow orchestrator, through [`WorkflowTrigger`].

pub mod orchestrator;

pub use orchestrator::{OrchestratorClient, OrchestratorConfig, OrchestratorError, WorkflowTrigger};
