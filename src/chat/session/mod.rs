
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AnswerSource, ChatError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation history for the chat panel.
///
/// While a question is pending the history ends with an empty assistant message.
/// If the question fails or is cancelled that placeholder is removed, so the
/// history never shows an empty answer.
pub struct ChatSession {
    source: Arc<dyn AnswerSource>,
    messages: Vec<ChatMessage>,
    error: Option<String>,
}

impl ChatSession {
    #[inline]
    pub fn new(source: Arc<dyn AnswerSource>) -> Self {
        Self {
            source,
            messages: Vec::new(),
            error: None,
        }
    }

    #[inline]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Last failure, if the most recent question failed
    #[inline]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Ask a question. Blank text does nothing.
    ///
    /// Returns the answer as appended to the history.
    #[inline]
    pub async fn send(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, ChatError> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(None);
        }

        self.messages.push(ChatMessage::user(question));
        self.error = None;
        self.messages.push(ChatMessage::assistant(""));

        match self.source.ask(question, cancel).await {
            Ok(answer) => {
                if let Some(last) = self.messages.last_mut() {
                    last.content.clone_from(&answer);
                }
                debug!("Chat answer received ({} chars)", answer.len());
                Ok(Some(answer))
            }
            Err(error) => {
                self.drop_empty_placeholder();
                if error == ChatError::Cancelled {
                    debug!("Chat question cancelled");
                } else {
                    warn!("Chat question failed: {}", error);
                    self.error = Some(error.to_string());
                }
                Err(error)
            }
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.messages.clear();
        self.error = None;
    }

    fn drop_empty_placeholder(&mut self) {
        if self
            .messages
            .last()
            .is_some_and(|m| m.role == Role::Assistant && m.content.is_empty())
        {
            self.messages.pop();
        }
    }
}
