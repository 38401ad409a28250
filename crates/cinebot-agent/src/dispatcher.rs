// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Concurrent execution of the tool calls proposed in one model response.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info};

use cinebot_core::{ChatMessage, ToolCall};
use cinebot_tools::{ToolContext, ToolOutcome, ToolRegistry};

/// Reply when the leading tool returned an empty result set.
pub const NO_MATCHING_SHOWTIMES: &str =
    "Rất tiếc, tôi không tìm thấy suất chiếu nào phù hợp với yêu cầu của bạn.";

/// Outcomes of one batch, in call order.
#[derive(Debug, Clone)]
pub struct ToolBatch {
    pub results: Vec<(ToolCall, ToolOutcome)>,
}

impl ToolBatch {
    /// Tool-role messages to persist and replay, one per call.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.results
            .iter()
            .map(|(call, outcome)| {
                ChatMessage::tool_result(
                    call.id.clone(),
                    call.function.name.clone(),
                    outcome.to_json().to_string(),
                )
            })
            .collect()
    }

    /// Reply to send instead of a synthesis call, if the first outcome
    /// carries no data.
    pub fn short_circuit(&self) -> Option<String> {
        match self.results.first().map(|(_, outcome)| outcome) {
            Some(ToolOutcome::Rows(rows)) if rows.is_empty() => Some(NO_MATCHING_SHOWTIMES.to_string()),
            Some(outcome) => outcome.marker_text().map(str::to_string),
            None => None,
        }
    }
}

/// Runs tool calls against a shared registry.
#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute every call concurrently. Individual failures are outcomes,
    /// not errors, so the batch itself cannot fail.
    pub async fn dispatch(&self, calls: &[ToolCall], ctx: &ToolContext) -> ToolBatch {
        info!(count = calls.len(), "dispatching tool calls");
        let outcomes = join_all(calls.iter().map(|call| self.registry.invoke(call, ctx))).await;
        for (call, outcome) in calls.iter().zip(&outcomes) {
            debug!(
                tool = %call.function.name,
                call_id = %call.id,
                marker = outcome.marker_text().is_some(),
                "tool finished"
            );
        }
        ToolBatch {
            results: calls.iter().cloned().zip(outcomes).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use cinebot_core::CinebotError;
    use cinebot_tools::{Tool, ToolId};
    use serde_json::{Value, json};

    use super::*;

    /// Sleeps for `delay_ms` then echoes the args as a record.
    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn id(&self) -> ToolId {
            ToolId::GetMovieDetails
        }

        fn description(&self) -> &str {
            "slow"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolOutcome, CinebotError> {
            let delay = args["delay_ms"].as_u64().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(ToolOutcome::Record(args.clone()))
        }
    }

    fn dispatcher() -> ToolDispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Slow));
        ToolDispatcher::new(Arc::new(registry))
    }

    fn batch(outcomes: Vec<ToolOutcome>) -> ToolBatch {
        ToolBatch {
            results: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, o)| (ToolCall::new(format!("c{i}"), "get_movie_details", "{}"), o))
                .collect(),
        }
    }

    #[tokio::test]
    async fn calls_run_concurrently_and_keep_call_order() {
        let calls = vec![
            ToolCall::new("a", "get_movie_details", r#"{"delay_ms": 200}"#),
            ToolCall::new("b", "get_movie_details", r#"{"delay_ms": 200}"#),
            ToolCall::new("c", "get_movie_details", r#"{"delay_ms": 10}"#),
        ];
        let started = std::time::Instant::now();
        let batch = dispatcher().dispatch(&calls, &ToolContext::new(None)).await;
        assert!(started.elapsed() < Duration::from_millis(380));

        let ids: Vec<&str> = batch.results.iter().map(|(c, _)| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let messages = batch.messages();
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("c"));
        assert_eq!(messages[2].name.as_deref(), Some("get_movie_details"));
        assert_eq!(messages[2].text(), r#"{"delay_ms":10}"#);
    }

    #[tokio::test]
    async fn unknown_tools_are_persisted_as_failures() {
        let calls = vec![ToolCall::new("x", "sell_popcorn", "{}")];
        let batch = dispatcher().dispatch(&calls, &ToolContext::new(None)).await;
        assert_eq!(batch.messages()[0].text(), r#"{"error":"Tool không xác định."}"#);
        assert_eq!(batch.short_circuit().as_deref(), Some("Tool không xác định."));
    }

    #[test]
    fn leading_marker_short_circuits_with_its_text() {
        let b = batch(vec![
            ToolOutcome::Clarification("Bạn muốn xem phim ở thành phố hay rạp nào?".into()),
            ToolOutcome::Rows(vec![json!({"title": "Mai"})]),
        ]);
        assert_eq!(
            b.short_circuit().as_deref(),
            Some("Bạn muốn xem phim ở thành phố hay rạp nào?")
        );
    }

    #[test]
    fn empty_rows_short_circuit_with_fixed_text() {
        let b = batch(vec![ToolOutcome::Rows(vec![])]);
        assert_eq!(b.short_circuit().as_deref(), Some(NO_MATCHING_SHOWTIMES));
    }

    #[test]
    fn data_first_goes_to_synthesis() {
        let b = batch(vec![
            ToolOutcome::Rows(vec![json!({"title": "Mai"})]),
            ToolOutcome::Failure("down".into()),
        ]);
        assert_eq!(b.short_circuit(), None);
        assert_eq!(batch(vec![]).short_circuit(), None);
    }
}
