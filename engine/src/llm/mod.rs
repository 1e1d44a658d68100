//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for talking to a language model.
//! The planner and the executor only see the `LLMProvider` trait; the
//! concrete provider (an OpenAI-compatible HTTP endpoint such as OpenRouter,
//! or the in-process mock) is chosen from configuration.

use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod mock;
pub mod openai;

pub use mock::MockProvider;
pub use openai::OpenAICompatibleProvider;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(e: LLMError) -> Self {
        EngineError::LLMProvider(e.to_string())
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openrouter", "openai", "mock")
    fn name(&self) -> &str;

    /// Returns the model identifier sent with each request
    fn model(&self) -> &str;

    /// Generate a response from the LLM
    ///
    /// # Arguments
    /// * `messages` - Conversation history including the system prompt
    ///
    /// # Returns
    /// * `Ok(String)` - The text of the model's reply
    /// * `Err(LLMError)` - If the request fails
    async fn generate(&self, messages: &[Message]) -> Result<String>;

    /// Run a single system/task prompt pair and return the reply text
    async fn invoke(&self, system_prompt: &str, task_prompt: &str) -> Result<String> {
        self.generate(&[Message::system(system_prompt), Message::user(task_prompt)])
            .await
    }

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(user_msg.content, "Hello");

        let system_msg = Message::system("You are a helpful assistant");
        assert_eq!(system_msg.role, MessageRole::System);
    }

    #[test]
    fn test_role_serialization_matches_display() {
        for role in [MessageRole::User, MessageRole::Assistant, MessageRole::System] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{}\"", role));
        }
    }

    #[test]
    fn test_llm_error_into_engine_error() {
        let err: EngineError = LLMError::RateLimitExceeded.into();
        assert!(matches!(err, EngineError::LLMProvider(ref m) if m == "Rate limit exceeded"));
    }

    #[tokio::test]
    async fn test_invoke_sends_system_then_user() {
        let provider = MockProvider::new("ok");
        let reply = provider.invoke("be brief", "say hi").await.unwrap();
        assert_eq!(reply, "ok");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0], Message::system("be brief"));
        assert_eq!(calls[0][1], Message::user("say hi"));
    }
}
