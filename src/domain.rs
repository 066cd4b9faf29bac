//! Domain types for the relay.
//!
//! A batch arrives as a [`BatchTriggerRequest`], travels the topic as one
//! JSON message, and is fanned out record-by-record into [`TriggerConf`]
//! payloads for the orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A batch of trigger records for one workflow.
///
/// This is both the ingress request body and the wire format on the topic
/// (one message per batch, never per record). The wire field name for the
/// workflow is `dagId` for compatibility with existing clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTriggerRequest {
    /// Target workflow definition
    #[serde(rename = "dagId")]
    pub workflow_id: String,

    /// Raw `"num1,num2"` records, dispatched in order
    pub inputs: Vec<String>,
}

impl BatchTriggerRequest {
    /// Encode to the UTF-8 JSON wire format
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Decode from the wire format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Errors parsing one `"num1,num2"` record.
///
/// Always a per-record failure: the rest of the batch still processes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    #[error("record {0:?} is missing a comma separator")]
    MissingSeparator(String),

    #[error("record {0:?} has more than one comma separator")]
    TooManySeparators(String),

    #[error("record {0:?} has a non-numeric operand {1:?}")]
    InvalidOperand(String, String),
}

/// Per-record run configuration sent to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConf {
    pub num1: String,
    pub num2: String,
}

impl TriggerConf {
    /// Parse one record into a conf.
    ///
    /// The record must split on a single comma into two trimmed tokens that
    /// both look numeric. Anything else is a [`RecordParseError`].
    pub fn parse(record: &str) -> Result<Self, RecordParseError> {
        let tokens: Vec<&str> = record.split(',').collect();
        match tokens.as_slice() {
            [num1, num2] => {
                let num1 = num1.trim();
                let num2 = num2.trim();
                for token in [num1, num2] {
                    if token.parse::<f64>().is_err() {
                        return Err(RecordParseError::InvalidOperand(
                            record.to_string(),
                            token.to_string(),
                        ));
                    }
                }
                Ok(Self {
                    num1: num1.to_string(),
                    num2: num2.to_string(),
                })
            }
            [_] => Err(RecordParseError::MissingSeparator(record.to_string())),
            _ => Err(RecordParseError::TooManySeparators(record.to_string())),
        }
    }
}

/// A run created by the orchestrator in response to one trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRun {
    pub run_id: String,
}

/// Result of one publisher-to-transport handoff. Logged, never stored.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    pub topic: String,
    pub success: bool,
    pub error: Option<String>,
}
