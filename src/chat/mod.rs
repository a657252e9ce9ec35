// Chat module
// Question/answer webhook client and the message history behind the chat panel

pub mod session;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use session::{ChatMessage, ChatSession, Role};
pub use webhook::{NO_RESPONSE, WebhookClient, extract_answer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Chat webhook is not configured: {0}")]
    NotConfigured(String),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Webhook error {status}: {message}")]
    Transport { status: u16, message: String },

    #[error("Webhook request failed: {0}")]
    Network(String),

    #[error("Invalid webhook response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Something that answers a documentation question
#[async_trait]
pub trait AnswerSource: Send + Sync {
    async fn ask(&self, question: &str, cancel: &CancellationToken) -> Result<String, ChatError>;
}
