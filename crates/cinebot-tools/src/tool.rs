// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool contract and registry for the catalog query tools.
//!
//! The set of tools is closed: every tool has a [`ToolId`] variant, and the
//! [`ToolRegistry`] maps identifiers to handlers sharing the [`Tool`]
//! contract. Model-supplied names are parsed into a [`ToolId`] once, at the
//! dispatch boundary.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, error, warn};

use cinebot_core::{CinebotError, Identity, ToolCall, ToolSpec};

/// Reply for a call naming a tool that does not exist.
pub const UNKNOWN_TOOL: &str = "Tool không xác định.";

/// Reply for a call whose arguments are not a JSON object.
pub const BAD_ARGUMENTS: &str = "Tham số gọi tool không hợp lệ.";

/// Reply for a storage fault inside a tool.
pub const STORAGE_FAILURE: &str = "Đã xảy ra lỗi khi truy vấn cơ sở dữ liệu.";

/// Every tool the model can call.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum ToolId {
    GetShowtimesForMovie,
    GetMoviesAtCinema,
    GetMovieDetails,
    GetMovieRecommendationsBasedOnHistory,
    SearchCgvPolicies,
}

/// What a tool produced.
///
/// Only `Rows` and `Record` carry data; the other variants are markers the
/// dispatcher may relay to the user verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// A result set (possibly empty).
    Rows(Vec<Value>),
    /// A single record.
    Record(Value),
    /// Required business information is missing; ask the user.
    Clarification(String),
    /// A well-formed lookup found nothing.
    Empty(String),
    /// The tool could not run. The text is safe to show to the user.
    Failure(String),
}

impl ToolOutcome {
    /// Serialize rows of any serializable type.
    pub fn rows<T: serde::Serialize>(rows: &[T]) -> Result<Self, CinebotError> {
        rows.iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Rows)
            .map_err(|e| CinebotError::Internal(format!("tool row serialization: {e}")))
    }

    /// The JSON stored as the tool message content.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Rows(rows) => Value::Array(rows.clone()),
            Self::Record(record) => record.clone(),
            Self::Clarification(message) | Self::Empty(message) => json!({ "message": message }),
            Self::Failure(message) => json!({ "error": message }),
        }
    }

    /// Text of a clarification, empty-result, or failure marker.
    pub fn marker_text(&self) -> Option<&str> {
        match self {
            Self::Clarification(m) | Self::Empty(m) | Self::Failure(m) => Some(m),
            Self::Rows(_) | Self::Record(_) => None,
        }
    }
}

/// Per-turn facts a tool may depend on.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Signed-in caller, `None` for guests.
    pub caller: Option<Identity>,
    /// Anchor instant for date resolution and "future showtimes only".
    pub now: DateTime<Utc>,
}

impl ToolContext {
    pub fn new(caller: Option<Identity>) -> Self {
        Self {
            caller,
            now: Utc::now(),
        }
    }
}

/// Contract shared by every catalog query tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn id(&self) -> ToolId;

    /// Natural-language description offered to the model.
    fn description(&self) -> &str;

    /// JSON Schema of the arguments object. No field is marked required so
    /// the model asks for missing details instead of failing validation.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. Business-rule gaps come back as
    /// [`ToolOutcome::Clarification`]; `Err` is reserved for faults.
    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<ToolOutcome, CinebotError>;
}

/// Trimmed, non-empty string argument.
pub fn str_arg(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Registry of available tools, keyed by [`ToolId`].
pub struct ToolRegistry {
    tools: HashMap<ToolId, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registers a tool under its `id()`, replacing any previous handler.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.id(), tool);
    }

    pub fn get(&self, id: ToolId) -> Option<Arc<dyn Tool>> {
        self.tools.get(&id).cloned()
    }

    /// Declarations for every registered tool, sorted by name.
    pub fn tool_specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self
            .tools
            .values()
            .map(|t| ToolSpec {
                name: t.id().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// Run one model-proposed call. Never fails: unknown tools, bad
    /// arguments, and faults all become [`ToolOutcome::Failure`].
    pub async fn invoke(&self, call: &ToolCall, ctx: &ToolContext) -> ToolOutcome {
        let name = call.function.name.as_str();
        let Some(tool) = ToolId::from_str(name).ok().and_then(|id| self.get(id)) else {
            warn!(tool = %name, "model called an unknown tool");
            return ToolOutcome::Failure(UNKNOWN_TOOL.to_string());
        };

        let raw = call.function.arguments.trim();
        let args = if raw.is_empty() {
            json!({})
        } else {
            match serde_json::from_str::<Value>(raw) {
                Ok(v @ Value::Object(_)) => v,
                Ok(Value::Null) => json!({}),
                Ok(_) | Err(_) => {
                    warn!(tool = %name, arguments = %raw, "tool arguments are not a JSON object");
                    return ToolOutcome::Failure(BAD_ARGUMENTS.to_string());
                }
            }
        };

        debug!(tool = %name, call_id = %call.id, %args, "executing tool");
        match tool.execute(&args, ctx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(tool = %name, error = %e, "tool execution failed");
                ToolOutcome::Failure(STORAGE_FAILURE.to_string())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
