// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Cinebot configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CinebotConfig {
    /// Assistant identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Language-model provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// External recommendation service.
    #[serde(default)]
    pub recommendation: RecommendationConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Assistant identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Persona name used in the system prompt.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path to a file whose text replaces the persona header of the
    /// discovery-stage system prompt.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "CGV-Bot".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// OpenAI-compatible chat-completions provider configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    #[serde(default = "default_provider_base_url")]
    pub base_url: String,

    /// API key. `None` requires the `CINEBOT_PROVIDER_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_provider_base_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_provider_timeout(),
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_provider_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_model() -> String {
    "moonshotai/kimi-k2-instruct-0905".to_string()
}

fn default_provider_timeout() -> u64 {
    60
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// How long a writer waits for the database lock, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("cinebot").join("cinebot.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("cinebot.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Conversation session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// A session whose last message is older than this is never reused.
    #[serde(default = "default_inactivity_hours")]
    pub inactivity_hours: u32,

    /// Number of most recent messages replayed to the model.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    /// Offset of the reference timezone from UTC, in hours.
    #[serde(default = "default_timezone_offset_hours")]
    pub timezone_offset_hours: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_hours: default_inactivity_hours(),
            history_limit: default_history_limit(),
            timezone_offset_hours: default_timezone_offset_hours(),
        }
    }
}

fn default_inactivity_hours() -> u32 {
    6
}

fn default_history_limit() -> u32 {
    15
}

fn default_timezone_offset_hours() -> i32 {
    7
}

/// External recommendation service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendationConfig {
    /// Base URL; `/recommendations/{user_id}` is appended.
    #[serde(default = "default_recommendation_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_recommendation_timeout")]
    pub timeout_secs: u64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            base_url: default_recommendation_base_url(),
            timeout_secs: default_recommendation_timeout(),
        }
    }
}

fn default_recommendation_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_recommendation_timeout() -> u64 {
    10
}

/// HTTP gateway configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// HS256 secret used to verify bearer tokens. `None` treats every
    /// caller as anonymous.
    #[serde(default)]
    pub jwt_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            jwt_secret: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    5001
}
