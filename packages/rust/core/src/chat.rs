//! Conversation memory for the chat modes.
//!
//! The model is stateless; every turn resends the whole history. History is
//! append-only: nothing is ever evicted, windowed, or summarized.

use tracing::{debug, instrument};

use researchkit_llm::{ChatRequest, CompletionClient};
use researchkit_shared::{ChatMessage, ResearchError, Result, Role};

/// Per-request settings for chat turns.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: Option<f32>,
}

/// An append-only conversation seeded with a system message.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages a user should see (everything but the system prompt).
    pub fn visible(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != Role::System)
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(content));
    }

    /// Request for the next assistant turn over the full history.
    pub fn request(&self, settings: &ChatSettings) -> ChatRequest {
        let mut request = ChatRequest::new(settings.model.clone(), self.messages.clone());
        request.temperature = settings.temperature;
        request
    }

    /// Append `user_message`, send the whole history, append and return the reply.
    ///
    /// Blank input is rejected without a network call. If the request fails the
    /// user message stays in the history and the error is returned.
    #[instrument(skip_all, fields(history = self.messages.len()))]
    pub async fn send<C: CompletionClient>(
        &mut self,
        client: &C,
        settings: &ChatSettings,
        user_message: &str,
    ) -> Result<String> {
        let user_message = user_message.trim();
        if user_message.is_empty() {
            return Err(ResearchError::invalid_input("message must not be empty"));
        }

        self.push_user(user_message);
        let completion = client.complete(&self.request(settings)).await?;

        debug!(chars = completion.text.len(), "assistant replied");
        self.push_assistant(completion.text.clone());
        Ok(completion.text)
    }

    /// Numbered `N. [ROLE]: content` lines, content cut at `max_chars`.
    pub fn history_preview(&self, max_chars: usize) -> Vec<String> {
        self.messages
            .iter()
            .enumerate()
            .map(|(i, msg)| {
                let role = msg.role.as_str().to_uppercase();
                format!("{}. [{role}]: {}", i + 1, preview(&msg.content, max_chars))
            })
            .collect()
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    if content.chars().count() > max_chars {
        let cut: String = content.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use researchkit_shared::Completion;

    /// Replies with a numbered answer and records the history length it saw.
    struct EchoClient {
        seen: RefCell<Vec<usize>>,
        fail: bool,
    }

    impl EchoClient {
        fn new() -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
                fail: false,
            }
        }
    }

    impl CompletionClient for EchoClient {
        async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
            self.seen.borrow_mut().push(request.messages.len());
            if self.fail {
                return Err(ResearchError::external("connection reset"));
            }
            let last = request.messages.last().map(|m| m.content.as_str()).unwrap_or("");
            Ok(Completion {
                text: format!("you said: {last}"),
                model: request.model.clone(),
                usage: None,
            })
        }
    }

    fn settings() -> ChatSettings {
        ChatSettings {
            model: "gpt-4o-mini".into(),
            temperature: Some(0.7),
        }
    }

    #[tokio::test]
    async fn each_turn_resends_full_history() {
        let client = EchoClient::new();
        let mut convo = Conversation::new("be nice");

        let reply = convo.send(&client, &settings(), "My name is Alice").await.unwrap();
        assert_eq!(reply, "you said: My name is Alice");
        convo.send(&client, &settings(), "What is my name?").await.unwrap();

        // system+user, then system+user+assistant+user
        assert_eq!(*client.seen.borrow(), vec![2, 4]);
        assert_eq!(convo.len(), 5);
        assert_eq!(convo.messages()[3].content, "What is my name?");
    }

    #[tokio::test]
    async fn blank_message_is_rejected_without_request() {
        let client = EchoClient::new();
        let mut convo = Conversation::new("sys");

        let err = convo.send(&client, &settings(), "  ").await.unwrap_err();
        assert!(matches!(err, ResearchError::InvalidInput { .. }));
        assert!(client.seen.borrow().is_empty());
        assert_eq!(convo.len(), 1);
    }

    #[tokio::test]
    async fn failed_turn_keeps_user_message() {
        let client = EchoClient {
            seen: RefCell::new(Vec::new()),
            fail: true,
        };
        let mut convo = Conversation::new("sys");

        let err = convo.send(&client, &settings(), "hello").await.unwrap_err();
        assert!(matches!(err, ResearchError::ExternalService { .. }));
        assert_eq!(convo.len(), 2);
        assert_eq!(convo.messages()[1], ChatMessage::user("hello"));
    }

    #[test]
    fn visible_hides_system_prompt() {
        let mut convo = Conversation::new("sys");
        convo.push_user("q");
        convo.push_assistant("a");
        let roles: Vec<Role> = convo.visible().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn history_preview_truncates_long_messages() {
        let mut convo = Conversation::new("sys");
        convo.push_user("x".repeat(120));
        convo.push_assistant("short");

        let lines = convo.history_preview(100);
        assert_eq!(lines[0], "1. [SYSTEM]: sys");
        assert_eq!(lines[1], format!("2. [USER]: {}...", "x".repeat(100)));
        assert_eq!(lines[2], "3. [ASSISTANT]: short");
    }

    #[test]
    fn request_uses_settings() {
        let convo = Conversation::new("sys");
        let req = convo.request(&settings());
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.temperature, Some(0.7));
        assert!(req.max_tokens.is_none());
        assert_eq!(req.messages.len(), 1);
    }
}
