//! Chat-completions client for ResearchKit.
//!
//! The pipeline and the conversation loop only see [`CompletionClient`];
//! [`OpenAiClient`] is the production implementation speaking the
//! OpenAI `/chat/completions` HTTP API (plain and streamed).

mod openai;

use researchkit_shared::{ChatMessage, Completion, Result};

pub use openai::{ChatStream, OpenAiClient};

/// A single chat-completions request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model id, e.g. `gpt-4o-mini`.
    pub model: String,
    /// Full message history, system message first.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature; provider default when `None`.
    pub temperature: Option<f32>,
    /// Completion length cap; provider default when `None`.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Anything that can turn a [`ChatRequest`] into a [`Completion`].
///
/// One call is one round-trip. Implementations must not retry; failures
/// surface as `ResearchError::ExternalService`.
pub trait CompletionClient {
    fn complete(&self, request: &ChatRequest) -> impl Future<Output = Result<Completion>>;
}
