//! Core domain types shared by the pipeline, the client, and the chat UIs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A validated research topic. Never empty or whitespace-only, and always a
/// single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic(String);

impl Topic {
    /// Validate and wrap a raw topic.
    ///
    /// Surrounding whitespace is trimmed. Line breaks join the lines with a
    /// single space and other control characters become spaces, so the topic
    /// always fits on a Markdown title line.
    pub fn new(raw: &str) -> Result<Self> {
        let joined = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let cleaned: String = joined
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();

        let trimmed = cleaned.trim();
        if trimmed.is_empty() {
            return Err(ResearchError::invalid_input("topic must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// Speaker of a chat message, serialized the way chat-completions APIs expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Text returned by the model. Treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Completion text, exactly as returned.
    pub text: String,
    /// Model id that produced the answer.
    pub model: String,
    /// Token usage, if the provider reported it.
    pub usage: Option<TokenUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_trims_whitespace() {
        let topic = Topic::new("  Black Holes \n").expect("valid topic");
        assert_eq!(topic.as_str(), "Black Holes");
        assert_eq!(topic.to_string(), "Black Holes");
    }

    #[test]
    fn topic_is_always_one_line() {
        let topic = Topic::new("Black\nHoles").expect("valid topic");
        assert_eq!(topic.as_str(), "Black Holes");

        let topic = Topic::new(" Dark \r\n\n  Matter\r").expect("valid topic");
        assert_eq!(topic.as_str(), "Dark Matter");

        let topic = Topic::new("Tab\there").expect("valid topic");
        assert_eq!(topic.as_str(), "Tab here");
        assert!(!topic.as_str().chars().any(char::is_control));
    }

    #[test]
    fn topic_rejects_blank_lines_only() {
        assert!(matches!(
            Topic::new("\n\r\n \n"),
            Err(ResearchError::InvalidInput { .. })
        ));
    }

    #[test]
    fn topic_rejects_empty() {
        assert!(matches!(
            Topic::new(""),
            Err(ResearchError::InvalidInput { .. })
        ));
        assert!(matches!(
            Topic::new("   \t"),
            Err(ResearchError::InvalidInput { .. })
        ));
    }

    #[test]
    fn chat_message_serializes_lowercase_role() {
        let msg = ChatMessage::assistant("hi");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn role_display() {
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(Role::User.as_str(), "user");
    }
}
