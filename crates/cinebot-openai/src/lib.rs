// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible chat-completions provider for Cinebot.
//!
//! Implements [`ProviderAdapter`] over `POST {base_url}/chat/completions`.
//! The default endpoint is Groq's OpenAI-compatible API, but any server that
//! speaks the same protocol (OpenAI, vLLM, a local proxy) works.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use cinebot_config::CinebotConfig;
use cinebot_core::traits::{PluginAdapter, ProviderAdapter};
use cinebot_core::types::{
    AdapterType, CompletionRequest, CompletionResponse, HealthStatus, ResponseFormat, TokenUsage,
};
use cinebot_core::CinebotError;
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatCompletionRequest, ResponseFormatSpec, ToolDefinition};

/// Environment variable consulted when `provider.api_key` is not configured.
pub const API_KEY_ENV: &str = "CINEBOT_PROVIDER_API_KEY";

/// Chat-completions provider implementing [`ProviderAdapter`].
///
/// API key resolution order: config -> `CINEBOT_PROVIDER_API_KEY` -> error.
pub struct OpenAiProvider {
    client: OpenAiClient,
}

impl OpenAiProvider {
    /// Creates a provider from the `[provider]` configuration section.
    pub fn new(config: &CinebotConfig) -> Result<Self, CinebotError> {
        let api_key = resolve_api_key(&config.provider.api_key)?;
        let client = OpenAiClient::new(
            &config.provider.base_url,
            &api_key,
            config.provider.model.clone(),
            Duration::from_secs(config.provider.timeout_secs),
        )?;

        info!(
            model = config.provider.model.as_str(),
            endpoint = client.endpoint(),
            "chat-completions provider initialized"
        );
        Ok(Self { client })
    }

    /// Creates a provider with an existing client.
    pub fn with_client(client: OpenAiClient) -> Self {
        Self { client }
    }

    /// Converts a [`CompletionRequest`] to the wire request.
    ///
    /// Tool calling is enabled (`tool_choice: "auto"`) only when tools are
    /// offered; JSON mode sets `response_format`.
    fn to_wire_request(&self, request: CompletionRequest) -> ChatCompletionRequest {
        let tools: Vec<ToolDefinition> = request.tools.into_iter().map(ToolDefinition::from).collect();
        let tool_choice = (!tools.is_empty()).then(|| "auto".to_string());
        let response_format = match request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::JsonObject => Some(ResponseFormatSpec {
                type_: "json_object".to_string(),
            }),
        };

        ChatCompletionRequest {
            model: self.client.model().to_string(),
            messages: request.messages,
            tools,
            tool_choice,
            response_format,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, CinebotError> {
        // No probe request: completions cost tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CinebotError> {
        debug!("chat-completions provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, CinebotError> {
        let wire = self.to_wire_request(request);
        debug!(
            messages = wire.messages.len(),
            tools = wire.tools.len(),
            json_mode = wire.response_format.is_some(),
            "sending completion request"
        );
        let response = self.client.complete(&wire).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CinebotError::provider("completion returned no choices"))?;

        Ok(CompletionResponse {
            id: response.id,
            model: response.model,
            message: choice.message,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            }),
        })
    }
}

/// Resolves the API key: config first, then the environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, CinebotError> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Ok(key.clone());
    }

    std::env::var(API_KEY_ENV).map_err(|_| {
        CinebotError::Config(format!(
            "provider API key not found. Set provider.api_key in config or {API_KEY_ENV}."
        ))
    })
}
