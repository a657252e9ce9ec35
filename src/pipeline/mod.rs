// Pipeline module
// Remote pipeline API client and the validate/execute/poll/teardown controller

pub mod api;
pub mod controller;
pub mod policy;

use serde_json::Value;
use thiserror::Error;

pub use api::{
    ApiEnvelope, HttpPipelineApi, PipelineApi, TaskHandle, format_error, validate_structure,
    wrap_payload,
};
pub use controller::{ExecutionSnapshot, PipelineController, PipelineStatus};
pub use policy::{PollOutcome, PollPolicy, Scheduler, TokioScheduler};

/// Every way an execution can fail.
///
/// Cancellation is listed so callers can tell it apart, but the controller reports a
/// cancelled run as idle rather than failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("Pipeline API key is not configured. Set PIPELINE_API_KEY or add api_key to the [pipeline] section.")]
    MissingApiKey,

    #[error("Pipeline API is misconfigured: {0}")]
    Misconfigured(String),

    #[error("Invalid pipeline: {0}")]
    InvalidConfig(String),

    #[error("Authentication failed. Check your API key.")]
    Authentication,

    /// Network failure (no status) or an HTTP error status
    #[error("{message}")]
    Transport { status: Option<u16>, message: String },

    /// Well-formed response carrying an error status
    #[error("{0}")]
    Application(String),

    #[error("Pipeline failed: {0}")]
    Failed(String),

    #[error("Pipeline did not reach a terminal status after {0} polls")]
    PollLimitExceeded(u32),

    #[error("A pipeline execution is already running")]
    AlreadyRunning,

    #[error("Execution cancelled")]
    Cancelled,
}

/// Output documents of a finished run, from `documents` or else `results`
#[inline]
pub fn result_documents(results: &Value) -> &[Value] {
    ["documents", "results"]
        .iter()
        .find_map(|key| results.get(key).and_then(Value::as_array))
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn documents_prefers_documents_key() {
        let results = json!({ "documents": [1, 2], "results": [3] });
        assert_eq!(result_documents(&results).len(), 2);
    }

    #[test]
    fn documents_falls_back_to_results_key() {
        let results = json!({ "results": [{ "text": "a" }] });
        assert_eq!(result_documents(&results).len(), 1);
        assert!(result_documents(&json!({ "documents": "nope" })).is_empty());
        assert!(result_documents(&Value::Null).is_empty());
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            PipelineError::Authentication.to_string(),
            "Authentication failed. Check your API key."
        );
        assert_eq!(
            PipelineError::PollLimitExceeded(200).to_string(),
            "Pipeline did not reach a terminal status after 200 polls"
        );
        assert_eq!(
            PipelineError::Failed("disk full".to_string()).to_string(),
            "Pipeline failed: disk full"
        );
    }
}
