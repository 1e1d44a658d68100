//! OpenAI-compatible chat completions provider
//!
//! Works against any endpoint that speaks the `/chat/completions` protocol:
//! OpenRouter (the default), OpenAI itself, or a local gateway.

use super::{LLMError, LLMProvider, Message};
use crate::config::ProviderConfig;
use crate::secrets::{scrub, SecretString};
use async_trait::async_trait;
use sdk::errors::EngineError;
use serde_json::json;
use std::time::Duration;

pub struct OpenAICompatibleProvider {
    name: String,
    base_url: String,
    model: String,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAICompatibleProvider {
    pub fn new(
        name: impl Into<String>,
        config: &ProviderConfig,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[Message]) -> super::Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut api_messages = Vec::new();
        for msg in messages {
            api_messages.push(json!({
                "role": msg.role.to_string(),
                "content": msg.content
            }));
        }

        let payload = json!({
            "model": self.model,
            "messages": api_messages,
        });

        tracing::debug!(
            "{} request: model={}, messages={}, total_chars={}",
            self.name,
            self.model,
            messages.len(),
            messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .header("X-Title", "foreman")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else if e.is_connect() {
                    LLMError::ProviderUnavailable(format!(
                        "Cannot connect to {} at {}",
                        self.name, self.base_url
                    ))
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = scrub(&response.text().await.unwrap_or_default());

            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(LLMError::AuthenticationFailed(text));
            } else if status.as_u16() == 429 {
                return Err(LLMError::RateLimitExceeded);
            } else {
                return Err(LLMError::InvalidRequest(format!("HTTP {}: {}", status, text)));
            }
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let message = choice
            .get("message")
            .ok_or_else(|| LLMError::ParseError("No message in choice".to_string()))?;

        match message.get("content").and_then(|c| c.as_str()) {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(LLMError::ParseError("Empty content".to_string())),
        }
    }

    /// Lists models with the configured key; any non-2xx answer is unhealthy
    async fn check_health(&self) -> bool {
        let url = format!("{}/models", self.base_url);

        match self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!("{} health check returned {}", self.name, response.status());
                false
            }
            Err(e) => {
                tracing::debug!("{} health check failed: {}", self.name, e);
                false
            }
        }
    }
}
