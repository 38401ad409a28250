// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock chat-completions provider for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with a scripted queue of
//! assistant messages and records every request it receives, so tests can
//! assert both what the engine sent and how many model calls it made.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use cinebot_core::traits::adapter::PluginAdapter;
use cinebot_core::traits::provider::ProviderAdapter;
use cinebot_core::types::{
    AdapterType, ChatMessage, CompletionRequest, CompletionResponse, HealthStatus, TokenUsage,
    ToolCall,
};
use cinebot_core::CinebotError;

/// One scripted provider answer.
#[derive(Debug, Clone)]
pub enum Scripted {
    Message(ChatMessage),
    /// Fail the call with a provider error carrying this message.
    Error(String),
}

/// A mock provider that replays scripted answers.
///
/// Answers are popped from a FIFO queue. When the queue is empty, a plain
/// "mock response" text is returned.
pub struct MockProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockProvider {
    /// Create a new mock provider with an empty queue.
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a plain text answer.
    pub async fn push_text(&self, text: &str) {
        self.push(Scripted::Message(ChatMessage::assistant(text))).await;
    }

    /// Queue an answer requesting tool calls, given as `(name, arguments)`.
    /// Call ids are `call_1`, `call_2`, ... in order.
    pub async fn push_tool_calls(&self, calls: &[(&str, &str)]) {
        let calls = calls
            .iter()
            .enumerate()
            .map(|(i, (name, args))| ToolCall::new(format!("call_{}", i + 1), *name, *args))
            .collect();
        self.push(Scripted::Message(ChatMessage::assistant_tool_calls(None, calls)))
            .await;
    }

    /// Queue a provider failure.
    pub async fn push_error(&self, message: &str) {
        self.push(Scripted::Error(message.to_string())).await;
    }

    pub async fn push(&self, answer: Scripted) {
        self.script.lock().await.push_back(answer);
    }

    /// Every request received so far, oldest first.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, CinebotError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CinebotError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CinebotError> {
        self.requests.lock().await.push(request);
        let next = self.script.lock().await.pop_front();
        let message = match next {
            Some(Scripted::Message(message)) => message,
            Some(Scripted::Error(message)) => return Err(CinebotError::provider(message)),
            None => ChatMessage::assistant("mock response"),
        };
        Ok(CompletionResponse {
            id: "mock-completion".to_string(),
            model: "mock-model".to_string(),
            message,
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_then_default() {
        let provider = MockProvider::new();
        provider.push_tool_calls(&[("get_movie_details", "{}")]).await;
        provider.push_error("rate limited").await;

        let first = provider.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(first.message.calls()[0].id, "call_1");
        assert!(provider.complete(CompletionRequest::default()).await.is_err());
        let last = provider.complete(CompletionRequest::default()).await.unwrap();
        assert_eq!(last.message.text(), "mock response");
        assert_eq!(provider.request_count().await, 3);
    }
}
