//! Generation collaborator seam.
//!
//! The orchestrator only knows `generate(system, input, continuation?) -> (text, continuation)`.
//! [`crate::openai_bridge::OpenAiResponsesBridge`] talks to a real model; [`MockGenerator`]
//! answers locally for `llm_mode = "mock"`.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::error::FormError;
use crate::session::ConversationHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    /// System instructions. Empty means none.
    pub system_prompt: String,
    pub user_input: String,
    /// Prior exchange to chain onto, if any.
    pub continuation: Option<ConversationHandle>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub continuation: Option<ConversationHandle>,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("response parse: {0}")]
    Parse(String),

    #[error("not configured: {0}")]
    NotConfigured(String),
}

impl From<GenerationError> for FormError {
    fn from(err: GenerationError) -> Self {
        FormError::GenerationUnavailable(err.to_string())
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError>;

    /// Short label for logs (e.g. model name).
    fn name(&self) -> &str;
}

/// Local stand-in: echoes the input and hands out sequential handles.
#[derive(Debug, Default)]
pub struct MockGenerator {
    counter: AtomicU64,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Generator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, GenerationError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let chained = match &request.continuation {
            Some(h) => format!(" (continuing {h})"),
            None => String::new(),
        };
        let preview: String = request.user_input.chars().take(120).collect();
        Ok(Generation {
            text: format!("[mock guidance{chained}] {preview}"),
            continuation: Some(ConversationHandle::new(format!("mock_resp_{n}"))),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
