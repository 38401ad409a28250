// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat turn engine.
//!
//! One call to [`ChatEngine::handle_turn`] runs a whole turn: resolve the
//! session, pick the dialogue stage, talk to the model (dispatching tools
//! in discovery, extracting a showtime choice in confirmation), and commit
//! every write of the turn at once.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use cinebot_config::model::CinebotConfig;
use cinebot_core::{
    ChatMessage, ChatRole, CinebotError, CompletionRequest, CompletionResponse, DialogueStage,
    Identity, ProviderAdapter, ResponseFormat,
};
use cinebot_storage::Database;
use cinebot_storage::queries::catalog::catalog_snapshot;
use cinebot_tools::{DateResolver, ToolContext, ToolRegistry};

use crate::confirmation;
use crate::context::{BOOKING_DATA_KEY, ContextStore, GuestEntry, TurnJournal, guest_history};
use crate::dispatcher::ToolDispatcher;
use crate::prompt::{CONFIRMATION_PROMPT, discovery_prompt, load_prompt_header};
use crate::stage;

/// Reply when the model produced no text.
pub const NO_ANSWER_REPLY: &str = "Xin lỗi, tôi chưa thể trả lời câu hỏi này.";

/// Engine tunables, usually taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub agent_name: String,
    /// Replaces the built-in persona line of the discovery prompt.
    pub prompt_header: Option<String>,
    pub history_limit: u32,
    pub inactivity: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            agent_name: "CGV-Bot".to_string(),
            prompt_header: None,
            history_limit: 15,
            inactivity: Duration::hours(6),
        }
    }
}

impl EngineSettings {
    pub async fn from_config(config: &CinebotConfig) -> Self {
        Self {
            agent_name: config.agent.name.clone(),
            prompt_header: load_prompt_header(&config.agent).await,
            history_limit: config.session.history_limit,
            inactivity: Duration::hours(i64::from(config.session.inactivity_hours)),
        }
    }
}

/// One incoming chat message.
#[derive(Debug, Clone, Default)]
pub struct ChatTurn {
    pub message: String,
    /// Session to continue. Ignored for guests.
    pub conversation_id: Option<String>,
    /// Client-side history. Only used for guests.
    pub history: Vec<GuestEntry>,
    pub caller: Option<Identity>,
}

/// The engine's answer to a turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub reply: String,
    /// `None` for guests.
    pub conversation_id: Option<String>,
    /// `[showtime]` when a showtime choice was confirmed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_data: Option<Value>,
}

/// A stored message as shown in the chat UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub text: String,
    /// `user` or `bot`.
    pub sender: String,
    pub timestamp: String,
    pub booking_data: Option<Value>,
}

/// The caller's active session, or nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationHistory {
    pub conversation_id: Option<String>,
    pub messages: Vec<HistoryEntry>,
}

/// Text and metadata of the final assistant message of a turn.
struct TurnReply {
    text: String,
    booking_data: Option<Value>,
}

impl TurnReply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            booking_data: None,
        }
    }
}

fn text_or_fallback(response: &CompletionResponse) -> String {
    let text = response.message.text().trim();
    if text.is_empty() {
        NO_ANSWER_REPLY.to_string()
    } else {
        text.to_string()
    }
}

/// Drives conversations against the catalog and a language model.
pub struct ChatEngine {
    db: Database,
    provider: Arc<dyn ProviderAdapter>,
    store: ContextStore,
    dispatcher: ToolDispatcher,
    dates: DateResolver,
    settings: EngineSettings,
    user_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl ChatEngine {
    pub fn new(
        db: Database,
        provider: Arc<dyn ProviderAdapter>,
        registry: Arc<ToolRegistry>,
        dates: DateResolver,
        settings: EngineSettings,
    ) -> Self {
        let store = ContextStore::new(db.clone(), settings.inactivity, settings.history_limit);
        Self {
            db,
            provider,
            store,
            dispatcher: ToolDispatcher::new(registry),
            dates,
            settings,
            user_locks: DashMap::new(),
        }
    }

    pub fn context_store(&self) -> &ContextStore {
        &self.store
    }

    pub fn dates(&self) -> &DateResolver {
        &self.dates
    }

    fn user_lock(&self, user_id: i64) -> Arc<Mutex<()>> {
        self.user_locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn handle_turn(&self, turn: ChatTurn) -> Result<ChatReply, CinebotError> {
        self.handle_turn_at(turn, Utc::now()).await
    }

    /// Run a turn anchored at `now`.
    ///
    /// For a signed-in caller the turn holds that user's lock from session
    /// resolution to commit. Any error discards every write of the turn.
    pub async fn handle_turn_at(
        &self,
        turn: ChatTurn,
        now: DateTime<Utc>,
    ) -> Result<ChatReply, CinebotError> {
        let result = match turn.caller.clone() {
            Some(user) => {
                let lock = self.user_lock(user.user_id);
                let _guard = lock.lock().await;
                self.signed_in_turn(user, turn, now).await
            }
            None => self.guest_turn(turn, now).await,
        };
        if let Err(e) = &result {
            error!(error = %e, "chat turn failed, nothing persisted");
        }
        result
    }

    async fn signed_in_turn(
        &self,
        user: Identity,
        turn: ChatTurn,
        now: DateTime<Utc>,
    ) -> Result<ChatReply, CinebotError> {
        let session = self
            .store
            .resolve_session(&user, turn.conversation_id.as_deref(), now)
            .await?;
        let history = if session.is_new {
            Vec::new()
        } else {
            self.store.load_history(&session.conversation_id).await?
        };
        let candidates = confirmation::candidates_in(&history);

        let mut journal = TurnJournal::new();
        let reply = self
            .run_stage(session.stage, &history, candidates, &turn.message, Some(&user), now, &mut journal)
            .await?;

        let next = stage::stage_after_reply(&reply.text);
        let write = journal.into_write(session.conversation_id.clone(), user, next);
        self.store.commit(write).await?;
        info!(
            conversation_id = %session.conversation_id,
            stage = %session.stage,
            next_stage = %next,
            "turn complete"
        );

        Ok(ChatReply {
            reply: reply.text,
            conversation_id: Some(session.conversation_id),
            booking_data: reply.booking_data,
        })
    }

    async fn guest_turn(&self, turn: ChatTurn, now: DateTime<Utc>) -> Result<ChatReply, CinebotError> {
        let guest = guest_history(&turn.history);
        let mut probe = guest.messages.clone();
        probe.push(ChatMessage::user(turn.message.clone()));
        let current = stage::classify(&probe);
        let candidates = confirmation::latest_candidates(guest.tool_results.iter().map(String::as_str));

        // Guests are never persisted; the journal is dropped.
        let mut journal = TurnJournal::new();
        let reply = self
            .run_stage(current, &guest.messages, candidates, &turn.message, None, now, &mut journal)
            .await?;
        debug!(stage = %current, "guest turn complete");

        Ok(ChatReply {
            reply: reply.text,
            conversation_id: None,
            booking_data: reply.booking_data,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_stage(
        &self,
        current: DialogueStage,
        history: &[ChatMessage],
        candidates: Option<Vec<Value>>,
        message: &str,
        caller: Option<&Identity>,
        now: DateTime<Utc>,
        journal: &mut TurnJournal,
    ) -> Result<TurnReply, CinebotError> {
        let user_message = ChatMessage::user(message);
        journal.record(&user_message, now);

        let reply = match current {
            DialogueStage::Discovery => {
                self.discover(history, user_message, caller, now, journal).await?
            }
            DialogueStage::AwaitingConfirmation => {
                self.confirm(history, user_message, candidates.as_deref()).await?
            }
        };

        let metadata = reply
            .booking_data
            .as_ref()
            .map(|data| json!({ BOOKING_DATA_KEY: data }));
        journal.record_with(&ChatMessage::assistant(reply.text.clone()), metadata, now);
        Ok(reply)
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CinebotError> {
        let response = self.provider.complete(request).await?;
        if let Some(usage) = response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion received"
            );
        }
        Ok(response)
    }

    /// Discovery: the model may call tools; their results are persisted and
    /// either relayed directly or synthesized into an answer.
    async fn discover(
        &self,
        history: &[ChatMessage],
        user_message: ChatMessage,
        caller: Option<&Identity>,
        now: DateTime<Utc>,
        journal: &mut TurnJournal,
    ) -> Result<TurnReply, CinebotError> {
        let today = self.dates.today(now).format("%Y-%m-%d").to_string();
        let snapshot = catalog_snapshot(&self.db, &today).await?;
        let system = discovery_prompt(
            &self.settings.agent_name,
            self.settings.prompt_header.as_deref(),
            caller.map(|c| c.name.as_str()),
            &snapshot,
        );

        let mut messages = Vec::with_capacity(history.len() + 4);
        messages.push(ChatMessage::system(system));
        messages.extend_from_slice(history);
        messages.push(user_message);

        let first = self
            .complete(CompletionRequest {
                messages: messages.clone(),
                tools: self.dispatcher.registry().tool_specs(),
                response_format: ResponseFormat::Text,
            })
            .await?;

        let calls = first.message.calls().to_vec();
        if calls.is_empty() {
            return Ok(TurnReply::text(text_or_fallback(&first)));
        }

        let invocation = ChatMessage::assistant_tool_calls(first.message.content.clone(), calls.clone());
        journal.record(&invocation, now);

        let ctx = ToolContext {
            caller: caller.cloned(),
            now,
        };
        let batch = self.dispatcher.dispatch(&calls, &ctx).await;
        let results = batch.messages();
        for result in &results {
            journal.record(result, now);
        }

        if let Some(text) = batch.short_circuit() {
            info!(tool = %calls[0].function.name, "leading tool returned no data, skipping synthesis");
            return Ok(TurnReply::text(text));
        }

        messages.push(invocation);
        messages.extend(results);
        let second = self
            .complete(CompletionRequest {
                messages,
                tools: Vec::new(),
                response_format: ResponseFormat::Text,
            })
            .await?;
        Ok(TurnReply::text(text_or_fallback(&second)))
    }

    /// Confirmation: the model may only return a structured choice, which is
    /// resolved against the last offered showtimes.
    async fn confirm(
        &self,
        history: &[ChatMessage],
        user_message: ChatMessage,
        candidates: Option<&[Value]>,
    ) -> Result<TurnReply, CinebotError> {
        let utterance = user_message.text().to_string();
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(CONFIRMATION_PROMPT));
        messages.extend(history.iter().filter(|m| m.role != ChatRole::Tool && m.tool_calls.is_none()).cloned());
        messages.push(user_message);

        let response = self
            .complete(CompletionRequest {
                messages,
                tools: Vec::new(),
                response_format: ResponseFormat::JsonObject,
            })
            .await?;

        let outcome = confirmation::extract(response.message.text(), candidates, &utterance, &self.dates);
        info!(outcome = outcome.label(), "showtime confirmation");
        Ok(TurnReply {
            text: outcome.reply_text(),
            booking_data: outcome.booking_data(),
        })
    }

    pub async fn history(&self, user: &Identity) -> Result<ConversationHistory, CinebotError> {
        self.history_at(user, Utc::now()).await
    }

    /// The caller's active session with tool traffic filtered out.
    pub async fn history_at(
        &self,
        user: &Identity,
        now: DateTime<Utc>,
    ) -> Result<ConversationHistory, CinebotError> {
        let Some(active) = self.store.latest_active_session(user.user_id, now).await? else {
            return Ok(ConversationHistory {
                conversation_id: None,
                messages: Vec::new(),
            });
        };

        let messages = self
            .store
            .session_messages(&active.conversation_id)
            .await?
            .into_iter()
            .filter(|m| matches!(m.role, ChatRole::User | ChatRole::Assistant))
            .filter_map(|m| {
                let text = m.content.filter(|t| !t.trim().is_empty())?;
                Some(HistoryEntry {
                    id: format!("db-{}", m.message_id),
                    text,
                    sender: if m.role == ChatRole::User { "user" } else { "bot" }.to_string(),
                    timestamp: m.created_at,
                    booking_data: m.metadata.and_then(|meta| meta.get(BOOKING_DATA_KEY).cloned()),
                })
            })
            .collect();

        Ok(ConversationHistory {
            conversation_id: Some(active.conversation_id),
            messages,
        })
    }
}
