//! RPC Response Types

use jobsync_core::application::TaskOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform response of every control-surface method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Envelope {
    pub fn data(data: Value) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
            duration_ms: None,
        }
    }

    pub fn message(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
            duration_ms: Some(duration_ms),
        }
    }
}

impl From<TaskOutcome> for Envelope {
    fn from(outcome: TaskOutcome) -> Self {
        Self {
            success: outcome.success,
            message: Some(outcome.message),
            data: outcome.data,
            error: outcome.error,
            duration_ms: Some(outcome.duration_ms),
        }
    }
}
