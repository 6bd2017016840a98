//! The unified chat vocabulary.
//!
//! These types are provider-neutral; each adapter translates them to and
//! from its vendor's wire format.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request Types
// ============================================================================

/// A single message in a conversation.
///
/// `role` is passed through as-is; providers understand at least
/// "system", "user", and "assistant".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Target model id; routing picks the provider that lists it.
    pub model: String,
    /// Conversation history, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Whether a streamed response was requested.
    #[serde(default)]
    pub stream: bool,
}

// ============================================================================
// Response Types
// ============================================================================

/// Token accounting for one completed request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    pub prompt_tokens: u32,
    /// Tokens in the completion.
    pub completion_tokens: u32,
    /// Prompt plus completion tokens.
    pub total_tokens: u32,
}

/// A chat completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Provider-assigned response id.
    pub id: String,
    /// Model that produced the response.
    pub model: String,
    /// Generated text.
    pub content: String,
    /// Token usage, when the provider reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Why generation stopped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req: ChatRequest = serde_json::from_str(
            r#"{"model": "gpt-4", "messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();
        assert!(!req.stream);
        assert!(req.max_tokens.is_none());
        assert!(req.temperature.is_none());
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(ChatMessage::user("q").role, "user");
        assert_eq!(ChatMessage::system("s").role, "system");
    }
}
