// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an OpenAI-compatible chat-completions endpoint.
//!
//! Provides [`OpenAiClient`] which handles request construction, bearer
//! authentication, and error mapping. Requests are never retried: a failed
//! completion fails the turn.

use std::time::Duration;

use cinebot_core::CinebotError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;

use crate::types::{ApiErrorResponse, ChatCompletionRequest, ChatCompletionResponse};

/// HTTP client for chat-completions communication.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OpenAiClient {
    /// Creates a client for `{base_url}/chat/completions`.
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: String,
        timeout: Duration,
    ) -> Result<Self, CinebotError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| CinebotError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| CinebotError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
        })
    }

    /// Returns the model identifier sent with every request.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends a request and returns the parsed response.
    pub async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, CinebotError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CinebotError::Provider {
                        message: "completion request timed out".into(),
                        source: Some(Box::new(e)),
                    }
                } else {
                    CinebotError::Provider {
                        message: format!("HTTP request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, "completion response received");

        let body = response.text().await.map_err(|e| CinebotError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => match api_err.error.type_ {
                    Some(kind) => format!("API error {status} ({kind}): {}", api_err.error.message),
                    None => format!("API error {status}: {}", api_err.error.message),
                },
                Err(_) => format!("API returned {status}: {body}"),
            };
            return Err(CinebotError::provider(message));
        }

        serde_json::from_str(&body).map_err(|e| CinebotError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinebot_core::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> OpenAiClient {
        OpenAiClient::new(base_url, "test-key", "test-model".into(), Duration::from_secs(5)).unwrap()
    }

    fn test_request() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "test-model".into(),
            messages: vec![ChatMessage::user("xin chào")],
            tools: vec![],
            tool_choice: None,
            response_format: None,
        }
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = test_client("https://api.groq.com/openai/v1/");
        assert_eq!(client.endpoint(), "https://api.groq.com/openai/v1/chat/completions");
    }

    #[tokio::test]
    async fn complete_sends_bearer_auth_and_parses_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({"model": "test-model"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "test-model",
                "choices": [{"message": {"role": "assistant", "content": "Chào bạn!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let resp = test_client(&server.uri()).complete(&test_request()).await.unwrap();
        assert_eq!(resp.choices[0].message.text(), "Chào bạn!");
    }

    #[tokio::test]
    async fn error_status_is_not_retried_and_carries_upstream_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"message": "Rate limit reached", "type": "rate_limit_exceeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).complete(&test_request()).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("429"), "{text}");
        assert!(text.contains("Rate limit reached"), "{text}");
    }

    #[tokio::test]
    async fn garbage_body_is_a_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).complete(&test_request()).await.unwrap_err();
        assert!(matches!(err, CinebotError::Provider { .. }));
    }
}
