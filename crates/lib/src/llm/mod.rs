//! LLM abstraction and OpenAI-compatible chat-completions client.
//!
//! The webhook only needs one non-streaming completion per request, so the seam is a single
//! `complete` call that returns the first choice's text.

mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::{CompletionParams, OpenAiClient};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("completion api error: {0}")]
    Api(String),
}

/// One role-tagged turn sent to the completion API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// Something that turns a prompt into generated text.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Request a single completion for `messages` and return its text.
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError>;
}
