#[cfg(test)]
mod tests;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use super::{AnswerSource, ChatError};
use crate::config::ChatConfig;

/// Shown when the webhook answered OK but carried no answers
pub const NO_RESPONSE: &str = "No response received.";

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Client for the chat webhook.
///
/// The question is posted as plain text; the answer is pulled out of the JSON
/// envelope with [`extract_answer`].
#[derive(Debug, Clone)]
pub struct WebhookClient {
    url: Url,
    authorization: String,
    agent: ureq::Agent,
}

impl WebhookClient {
    #[inline]
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let mut url = config
            .webhook_url()
            .map_err(|e| ChatError::NotConfigured(e.to_string()))?;

        let authorization = config
            .authorization
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ChatError::NotConfigured("missing authorization key".to_string()))?
            .to_string();

        if let Some(token) = config.webhook_token.as_deref().filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("token", token);
        }

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .http_status_as_error(false)
            .build()
            .into();

        Ok(Self {
            url,
            authorization,
            agent,
        })
    }

    #[inline]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Post the question and wait for the raw JSON response
    #[inline]
    pub fn post_blocking(&self, question: &str) -> Result<Value, ChatError> {
        debug!("Posting {} chars to chat webhook {}", question.len(), self.url.path());

        let mut response = self
            .agent
            .post(self.url.as_str())
            .header("Content-Type", "text/plain")
            .header("Authorization", self.authorization.as_str())
            .send(question)
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ChatError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            warn!("Chat webhook returned {}", status);
            return Err(ChatError::Transport {
                status,
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ChatError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl AnswerSource for WebhookClient {
    async fn ask(&self, question: &str, cancel: &CancellationToken) -> Result<String, ChatError> {
        let question = question.trim().to_string();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }

        let client = self.clone();
        let request = tokio::task::spawn_blocking(move || client.post_blocking(&question));

        // The blocking request cannot be interrupted; on cancel its result is dropped
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("Chat request cancelled");
                return Err(ChatError::Cancelled);
            }
            joined = request => joined
                .map_err(|e| ChatError::Network(format!("request task failed: {}", e)))??,
        };

        Ok(extract_answer(&response))
    }
}

/// Turn a webhook response envelope into display text.
///
/// A non-OK status becomes `Error: <status>`. Otherwise the answers are joined with
/// newlines, falling back to [`NO_RESPONSE`].
#[inline]
pub fn extract_answer(response: &Value) -> String {
    match response.get("status") {
        Some(Value::String(status)) if status == "OK" => {}
        Some(Value::String(status)) if !status.is_empty() => return format!("Error: {}", status),
        None | Some(Value::Null | Value::String(_)) => return "Error: Unknown error".to_string(),
        Some(other) => return format!("Error: {}", other),
    }

    let answers: Vec<&str> = response
        .pointer("/data/objects/body/answers")
        .and_then(Value::as_array)
        .map(|answers| answers.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if answers.is_empty() {
        NO_RESPONSE.to_string()
    } else {
        answers.join("\n")
    }
}
