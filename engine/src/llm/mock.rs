//! Mock LLM Provider
//!
//! Deterministic in-process provider for tests and offline runs. Replies are
//! resolved in this order:
//! 1. the next scripted reply, if any are queued
//! 2. a reply registered for the exact system prompt of the request
//! 3. the fallback reply
//!
//! Every request is recorded so tests can inspect what was sent.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use super::{LLMError, LLMProvider, Message, MessageRole, Result};

enum Scripted {
    Reply(String),
    Failure(String),
}

pub struct MockProvider {
    fallback: String,
    script: Mutex<VecDeque<Scripted>>,
    by_system_prompt: HashMap<String, String>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    /// Create a mock that answers every request with `fallback`
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            fallback: fallback.into(),
            script: Mutex::new(VecDeque::new()),
            by_system_prompt: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply for the next unscripted request
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        lock(&self.script).push_back(Scripted::Reply(reply.into()));
        self
    }

    /// Queue a failure for the next unscripted request
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        lock(&self.script).push_back(Scripted::Failure(message.into()));
        self
    }

    /// Answer requests whose system prompt equals `system_prompt` with `reply`
    pub fn with_system_reply(
        mut self,
        system_prompt: impl Into<String>,
        reply: impl Into<String>,
    ) -> Self {
        self.by_system_prompt
            .insert(system_prompt.into(), reply.into());
        self
    }

    /// All requests received so far, oldest first
    pub fn calls(&self) -> Vec<Vec<Message>> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(&self, messages: &[Message]) -> Result<String> {
        lock(&self.calls).push(messages.to_vec());

        if let Some(next) = lock(&self.script).pop_front() {
            return match next {
                Scripted::Reply(reply) => Ok(reply),
                Scripted::Failure(message) => Err(LLMError::ProviderUnavailable(message)),
            };
        }

        let system_prompt = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str());
        if let Some(reply) = system_prompt.and_then(|p| self.by_system_prompt.get(p)) {
            return Ok(reply.clone());
        }

        Ok(self.fallback.clone())
    }
}

// A panic while holding the lock cannot leave the queue half-updated
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
