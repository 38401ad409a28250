// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client for the external recommendation service.
//!
//! `GET {base_url}/recommendations/{user_id}` answers with a list of movies,
//! `{"recommendations": [...]}`, or a `{"message"}` / `{"error"}` object.
//! Calls are never retried.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use cinebot_core::{AdapterType, CinebotError, HealthStatus, PluginAdapter};

/// What the recommendation service said.
#[derive(Debug, Clone, PartialEq)]
pub enum RecommendationReply {
    Movies(Vec<Value>),
    /// An informational message, e.g. "no watch history yet".
    Message(String),
    /// A service-side error message.
    Error(String),
}

/// Source of personalized recommendations.
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommend(&self, user_id: i64) -> Result<RecommendationReply, CinebotError>;
}

/// Recommendation source backed by the HTTP service.
pub struct HttpRecommender {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecommender {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CinebotError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CinebotError::Recommendation {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request_failed(e: reqwest::Error) -> CinebotError {
        CinebotError::Recommendation {
            message: format!("request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

/// Interpret a response body.
pub fn parse_reply(body: Value) -> Result<RecommendationReply, CinebotError> {
    match body {
        Value::Array(movies) => Ok(RecommendationReply::Movies(movies)),
        Value::Object(mut map) => {
            if let Some(Value::String(message)) = map.remove("message") {
                return Ok(RecommendationReply::Message(message));
            }
            if let Some(error) = map.remove("error") {
                let text = match error {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                return Ok(RecommendationReply::Error(text));
            }
            match map.remove("recommendations") {
                Some(Value::Array(movies)) => Ok(RecommendationReply::Movies(movies)),
                _ => Err(CinebotError::Recommendation {
                    message: "unexpected response object".into(),
                    source: None,
                }),
            }
        }
        other => Err(CinebotError::Recommendation {
            message: format!("unexpected response: {other}"),
            source: None,
        }),
    }
}

#[async_trait]
impl RecommendationSource for HttpRecommender {
    async fn recommend(&self, user_id: i64) -> Result<RecommendationReply, CinebotError> {
        let url = format!("{}/recommendations/{user_id}", self.base_url);
        debug!(%url, user_id, "requesting recommendations");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::request_failed)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CinebotError::Recommendation {
                message: format!("service returned {status}: {body}"),
                source: None,
            });
        }

        let body: Value = response.json().await.map_err(Self::request_failed)?;
        parse_reply(body)
    }
}

#[async_trait]
impl PluginAdapter for HttpRecommender {
    fn name(&self) -> &str {
        "recommendation-http"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Recommendation
    }

    /// Any HTTP answer counts as reachable.
    async fn health_check(&self) -> Result<HealthStatus, CinebotError> {
        match self.client.get(&self.base_url).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Degraded(format!("unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), CinebotError> {
        Ok(())
    }
}
