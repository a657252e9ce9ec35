
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::PipelineError;
use crate::config::PipelineApiConfig;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Response body shared by every pipeline endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiEnvelope {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status.as_deref() == Some("OK")
    }

    /// Displayable form of the top-level `error` field
    #[inline]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(format_error)
    }

    /// Error reported in the envelope itself: a `status` other than `OK` or a
    /// non-empty `error` field. An absent `status` is not an error.
    #[inline]
    pub fn application_error(&self) -> Option<String> {
        match self.status.as_deref() {
            Some(status) if status != "OK" => Some(
                self.error_message()
                    .unwrap_or_else(|| format!("status {}", status)),
            ),
            _ => self.error_message(),
        }
    }

    /// `data.status` of a poll response
    #[inline]
    pub fn task_status(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|data| data.get("status"))
            .and_then(Value::as_str)
    }

    /// `data.error` of a poll response
    #[inline]
    pub fn task_error(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.get("error"))
            .and_then(format_error)
    }
}

/// Identifies a submitted task for polling and teardown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub token: String,
    #[serde(rename = "type")]
    pub task_type: String,
}

/// Remote pipeline service.
///
/// Implementations map transport problems to [`PipelineError`] and hand back the
/// decoded envelope otherwise; interpreting `status` is left to the controller.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Checked before anything is sent. Fails when credentials are missing.
    fn check_ready(&self) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn validate(&self, payload: &Value) -> Result<ApiEnvelope, PipelineError>;

    async fn execute(&self, payload: &Value) -> Result<ApiEnvelope, PipelineError>;

    async fn poll_status(&self, task: &TaskHandle) -> Result<ApiEnvelope, PipelineError>;

    async fn teardown(&self, task: &TaskHandle) -> Result<ApiEnvelope, PipelineError>;
}

/// Error field as text: strings verbatim, anything else as pretty JSON.
/// Null and empty strings count as absent.
#[inline]
pub fn format_error(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some(message.clone()),
        other => serde_json::to_string_pretty(other).ok(),
    }
}

/// Reject a pipeline definition that has no `components` array
#[inline]
pub fn validate_structure(config: &Value) -> Result<(), PipelineError> {
    let pipeline = config.get("pipeline").unwrap_or(config);
    if !config.is_object() || !pipeline.is_object() {
        return Err(PipelineError::InvalidConfig(
            "the pipeline definition must be a JSON object".to_string(),
        ));
    }
    match pipeline.get("components") {
        Some(Value::Array(_)) => Ok(()),
        _ => Err(PipelineError::InvalidConfig(
            "missing \"components\" array. The pipeline JSON must contain a \"components\" \
             array of stage definitions."
                .to_string(),
        )),
    }
}

/// Build the request body sent to validate and execute.
///
/// A definition that already has a `pipeline` key keeps its own `errors` and
/// `warnings`; a bare pipeline is wrapped with empty ones.
#[inline]
pub fn wrap_payload(config: &Value) -> Value {
    match config.get("pipeline") {
        Some(pipeline) if !pipeline.is_null() => json!({
            "pipeline": pipeline,
            "errors": list_or_empty(config.get("errors")),
            "warnings": list_or_empty(config.get("warnings")),
        }),
        _ => json!({
            "pipeline": config,
            "errors": [],
            "warnings": [],
        }),
    }
}

fn list_or_empty(value: Option<&Value>) -> Value {
    value
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| json!([]))
}

enum Call {
    Get,
    Delete,
    Post(String),
    Put(String),
}

/// HTTP client for the pipeline service.
///
/// Requests are blocking `ureq` calls run on tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct HttpPipelineApi {
    base_url: Url,
    api_key: Option<String>,
    task_name: String,
    agent: ureq::Agent,
}

impl HttpPipelineApi {
    #[inline]
    pub fn new(config: &PipelineApiConfig) -> Result<Self, PipelineError> {
        let mut base_url = config
            .base_url()
            .map_err(|e| PipelineError::Misconfigured(e.to_string()))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            base_url,
            api_key: config.api_key().map(str::to_string),
            task_name: config.task_name.clone(),
            agent,
        })
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, PipelineError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| PipelineError::Misconfigured(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    fn task_endpoint(&self, task: &TaskHandle) -> Result<Url, PipelineError> {
        self.endpoint(
            "task",
            &[("token", task.token.as_str()), ("type", task.task_type.as_str())],
        )
    }

    fn request_blocking(&self, call: Call, url: &Url) -> Result<ApiEnvelope, PipelineError> {
        let api_key = self.api_key.as_deref().ok_or(PipelineError::MissingApiKey)?;
        let bearer = format!("Bearer {}", api_key);

        let result = match call {
            Call::Get => self
                .agent
                .get(url.as_str())
                .header("Authorization", bearer.as_str())
                .call(),
            Call::Delete => self
                .agent
                .delete(url.as_str())
                .header("Authorization", bearer.as_str())
                .call(),
            Call::Post(body) => self
                .agent
                .post(url.as_str())
                .header("Authorization", bearer.as_str())
                .header("Content-Type", "application/json")
                .send(body.as_str()),
            Call::Put(body) => self
                .agent
                .put(url.as_str())
                .header("Authorization", bearer.as_str())
                .header("Content-Type", "application/json")
                .send(body.as_str()),
        };

        let mut response = result.map_err(|e| {
            warn!("Pipeline API request to {} failed: {}", url.path(), e);
            PipelineError::Transport {
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| PipelineError::Transport {
                status: Some(status),
                message: format!("Failed to read response body: {}", e),
            })?;

        debug!("Pipeline API {} responded {}", url.path(), status);
        interpret_response(status, &body)
    }

    async fn send(&self, call: Call, url: Url) -> Result<ApiEnvelope, PipelineError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.request_blocking(call, &url))
            .await
            .map_err(|e| PipelineError::Transport {
                status: None,
                message: format!("request task failed: {}", e),
            })?
    }
}

#[async_trait]
impl PipelineApi for HttpPipelineApi {
    fn check_ready(&self) -> Result<(), PipelineError> {
        self.api_key.as_ref().map(|_| ()).ok_or(PipelineError::MissingApiKey)
    }

    async fn validate(&self, payload: &Value) -> Result<ApiEnvelope, PipelineError> {
        let url = self.endpoint("pipe/validate", &[])?;
        self.send(Call::Post(payload.to_string()), url).await
    }

    async fn execute(&self, payload: &Value) -> Result<ApiEnvelope, PipelineError> {
        let url = self.endpoint("task", &[("name", self.task_name.as_str())])?;
        self.send(Call::Put(payload.to_string()), url).await
    }

    async fn poll_status(&self, task: &TaskHandle) -> Result<ApiEnvelope, PipelineError> {
        let url = self.task_endpoint(task)?;
        self.send(Call::Get, url).await
    }

    async fn teardown(&self, task: &TaskHandle) -> Result<ApiEnvelope, PipelineError> {
        let url = self.task_endpoint(task)?;
        self.send(Call::Delete, url).await
    }
}

/// Map an HTTP status and body to an envelope or a transport error.
///
/// 401 is reported as an authentication failure. Other error statuses keep the code
/// and the body's `error` field, or the raw body text when there is no such field.
pub(crate) fn interpret_response(status: u16, body: &str) -> Result<ApiEnvelope, PipelineError> {
    let json: Option<Value> = serde_json::from_str(body).ok();

    if status == 401 {
        return Err(PipelineError::Authentication);
    }

    if status >= 400 {
        let detail = json
            .as_ref()
            .and_then(|json| json.get("error"))
            .and_then(format_error)
            .or_else(|| Some(body.trim().to_string()).filter(|text| !text.is_empty()));
        let message = match detail {
            Some(detail) => format!("HTTP {}: {}", status, detail),
            None => format!("HTTP {}", status),
        };
        return Err(PipelineError::Transport {
            status: Some(status),
            message,
        });
    }

    let json = json.ok_or_else(|| PipelineError::Transport {
        status: Some(status),
        message: "API response was not valid JSON".to_string(),
    })?;

    serde_json::from_value(json).map_err(|e| PipelineError::Transport {
        status: Some(status),
        message: format!("Unexpected API response: {}", e),
    })
}
