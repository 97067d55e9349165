//! Chat message types

use serde::{Deserialize, Serialize};

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Instructions for the model
    System,
    /// End-user input
    User,
    /// Model output
    Assistant,
}

impl MessageRole {
    /// Wire name of the role
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: MessageRole,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a message with an explicit role
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

/// Output contract requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    /// Free-form text
    #[default]
    Text,
    /// A single well-formed JSON object
    JsonObject,
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Sum of both
    pub total_tokens: u32,
}

/// A completed chat response
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Assistant text
    pub content: String,

    /// Model that produced the response
    pub model: String,

    /// Why generation stopped, if reported
    pub finish_reason: Option<String>,

    /// Token usage, if reported
    pub usage: Option<Usage>,
}

impl ChatResponse {
    /// Build a response carrying only text (useful for scripted backends)
    pub fn text(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_with_lowercase_role() {
        let msg = ChatMessage::system("be terse");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be terse");

        let back: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
