//! OpenAI chat-completions adapter (`POST {base_url}/chat/completions`).
//!
//! Wire types are private to this module. Works against any endpoint that
//! speaks the same protocol (OpenAI, OpenRouter, local servers).

use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use eventsource_stream::{Event, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};
use url::Url;

use researchkit_shared::{
    ChatMessage, Completion, OpenAiConfig, ResearchError, Result, TokenUsage,
};

use crate::{ChatRequest, CompletionClient};

/// User-Agent string for provider requests.
const USER_AGENT: &str = concat!("ResearchKit/", env!("CARGO_PKG_VERSION"));

/// How much of a non-JSON error body is kept in the error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
///
/// Cheap to clone: `reqwest::Client` is reference-counted.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl OpenAiClient {
    /// Build a client for `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// With `timeout_secs = None` no request timeout is set.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout_secs: Option<u64>) -> Result<Self> {
        let endpoint = chat_endpoint(base_url)?;

        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ResearchError::external(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
        })
    }

    /// Build a client from the `[openai]` config section.
    pub fn from_config(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        Self::new(&config.base_url, api_key, config.timeout_secs)
    }

    /// Full URL requests are sent to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Start a streamed completion. Deltas are pulled with [`ChatStream::next_delta`].
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    pub async fn stream(&self, request: &ChatRequest) -> Result<ChatStream> {
        let response = self.send(request, true).await?;
        debug!("stream opened");
        Ok(ChatStream::new(response, request.model.clone()))
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let payload = WireRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.endpoint, error = %e, "LLM request failed (transport)");
                ResearchError::external(format!("request to {} failed: {e}", self.endpoint))
            })?;

        check_status(response).await
    }
}

impl CompletionClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let response = self.send(request, false).await?;

        let parsed: WireResponse = response.json().await.map_err(|e| {
            ResearchError::external(format!("failed to parse completion response: {e}"))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ResearchError::external("empty or missing content in response"))?;

        let usage = parsed.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });

        info!(
            chars = text.len(),
            tokens_in = usage.map(|u| u.prompt_tokens),
            tokens_out = usage.map(|u| u.completion_tokens),
            "completion received"
        );

        Ok(Completion {
            text,
            model: parsed.model.unwrap_or_else(|| request.model.clone()),
            usage,
        })
    }
}

/// Append `chat/completions` to the base URL, keeping its path prefix.
fn chat_endpoint(base_url: &str) -> Result<Url> {
    let base = if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{base_url}/")
    };
    Url::parse(&base)
        .and_then(|u| u.join("chat/completions"))
        .map_err(|e| ResearchError::config(format!("invalid base_url '{base_url}': {e}")))
}

/// Pass 2xx responses through; turn anything else into `ExternalService`.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => format!("HTTP {status}: {}", env.error.message),
        Err(_) => {
            let snippet: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            format!("HTTP {status}: {snippet}")
        }
    };

    error!(%status, %message, "LLM request returned HTTP error");
    Err(ResearchError::external_status(status.as_u16(), message))
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Server-sent events decoded from the response body.
type EventStream = Pin<Box<dyn Stream<Item = Result<Event>> + Send>>;

/// An open streamed completion.
///
/// Pull deltas with [`next_delta`](Self::next_delta) until it yields `None`,
/// then take the assembled text with [`into_completion`](Self::into_completion).
pub struct ChatStream {
    events: EventStream,
    pending: VecDeque<String>,
    text: String,
    model: String,
    done: bool,
}

impl fmt::Debug for ChatStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatStream")
            .field("model", &self.model)
            .field("received_chars", &self.text.len())
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl ChatStream {
    fn new(response: reqwest::Response, model: String) -> Self {
        Self::from_bytes(response.bytes_stream(), model)
    }

    /// Decode an SSE body delivered as arbitrary byte chunks.
    fn from_bytes<S, B, E>(bytes: S, model: String) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let events = bytes.eventsource().map(|item| {
            item.map_err(|e| ResearchError::external(format!("stream read failed: {e}")))
        });

        Self {
            events: Box::pin(events),
            pending: VecDeque::new(),
            text: String::new(),
            model,
            done: false,
        }
    }

    /// Next content fragment, or `None` once the stream has ended.
    ///
    /// An error chunk from the provider ends the stream with
    /// `ResearchError::ExternalService`; text received before it is kept in
    /// [`text`](Self::text) but never completes normally.
    pub async fn next_delta(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(delta) = self.pending.pop_front() {
                return Ok(Some(delta));
            }
            if self.done {
                return Ok(None);
            }

            match self.events.next().await {
                Some(Ok(event)) => {
                    if let Err(e) = self.handle(&event.data) {
                        self.done = true;
                        self.pending.clear();
                        return Err(e);
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Err(e);
                }
                None => self.done = true,
            }
        }
    }

    /// Text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Drain whatever is left and return the assembled completion.
    pub async fn collect(mut self) -> Result<Completion> {
        while self.next_delta().await?.is_some() {}
        Ok(self.into_completion())
    }

    pub fn into_completion(self) -> Completion {
        Completion {
            text: self.text,
            model: self.model,
            usage: None,
        }
    }

    fn handle(&mut self, data: &str) -> Result<()> {
        let data = data.trim();
        if data.is_empty() {
            return Ok(());
        }
        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let chunk: StreamChunk = serde_json::from_str(data)
            .map_err(|e| ResearchError::external(format!("invalid stream chunk: {e}")))?;

        if let Some(err) = chunk.error {
            error!(message = %err.message, "LLM stream returned an error chunk");
            return Err(ResearchError::external(err.message));
        }

        if let Some(model) = chunk.model {
            self.model = model;
        }
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
                self.text.push_str(&content);
                self.pending.push_back(content);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    // Set when the provider aborts mid-stream.
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
