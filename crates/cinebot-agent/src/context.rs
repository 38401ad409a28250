// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context: session resolution, history replay, and the
//! per-turn write journal.
//!
//! Authenticated callers get a durable, time-windowed session. Guests are
//! stateless: their history arrives with every request and nothing is stored.
//! Writes of one turn are buffered in a [`TurnJournal`] and committed in a
//! single transaction, so a failed turn leaves no trace.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info, warn};

use cinebot_core::{ChatMessage, ChatRole, CinebotError, DialogueStage, Identity, ToolCall};
use cinebot_storage::queries::conversations::{commit_turn, find_conversation, latest_conversation};
use cinebot_storage::queries::messages::{conversation_messages, recent_messages};
use cinebot_storage::{
    ConversationActivity, Database, NewMessage, StoredMessage, TIMESTAMP_FORMAT, TurnWrite,
};
use cinebot_tools::dates::parse_instant;

/// Metadata key carrying a confirmed showtime on an assistant message.
pub const BOOKING_DATA_KEY: &str = "booking_data";

/// The session a turn runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub conversation_id: String,
    /// Persisted stage of a reused session; `Discovery` for a new one.
    pub stage: DialogueStage,
    /// `true` when the id was freshly allocated and has no history.
    pub is_new: bool,
}

/// One entry of a guest's client-side history.
#[derive(Debug, Clone, Deserialize)]
pub struct GuestEntry {
    pub sender: String,
    #[serde(default)]
    pub text: String,
}

/// Durable per-conversation message log with session-expiry semantics.
#[derive(Clone)]
pub struct ContextStore {
    db: Database,
    inactivity: Duration,
    history_limit: u32,
}

impl ContextStore {
    pub fn new(db: Database, inactivity: Duration, history_limit: u32) -> Self {
        Self {
            db,
            inactivity,
            history_limit,
        }
    }

    pub fn history_limit(&self) -> u32 {
        self.history_limit
    }

    fn is_active(&self, activity: &ConversationActivity, now: DateTime<Utc>) -> bool {
        activity
            .last_message_at
            .as_deref()
            .and_then(parse_instant)
            .is_some_and(|last| now - last <= self.inactivity)
    }

    /// Reuse the supplied session when it belongs to `user` and is still
    /// active; otherwise allocate `user_{id}_{unix_millis}`.
    pub async fn resolve_session(
        &self,
        user: &Identity,
        supplied: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SessionHandle, CinebotError> {
        if let Some(id) = supplied.map(str::trim).filter(|id| !id.is_empty()) {
            match find_conversation(&self.db, id).await? {
                Some(activity)
                    if activity.user_id == user.user_id && self.is_active(&activity, now) =>
                {
                    debug!(conversation_id = %id, stage = %activity.stage, "reusing session");
                    return Ok(SessionHandle {
                        conversation_id: activity.conversation_id,
                        stage: activity.stage,
                        is_new: false,
                    });
                }
                Some(activity) if activity.user_id != user.user_id => {
                    warn!(
                        conversation_id = %id,
                        user_id = user.user_id,
                        "session belongs to another user, starting a new one"
                    );
                }
                Some(_) => debug!(conversation_id = %id, "session expired"),
                None => debug!(conversation_id = %id, "session not found"),
            }
        }

        let conversation_id = format!("user_{}_{}", user.user_id, now.timestamp_millis());
        info!(conversation_id = %conversation_id, user_id = user.user_id, "new session");
        Ok(SessionHandle {
            conversation_id,
            stage: DialogueStage::Discovery,
            is_new: true,
        })
    }

    /// The user's most recent session, unless it has expired.
    pub async fn latest_active_session(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<ConversationActivity>, CinebotError> {
        Ok(latest_conversation(&self.db, user_id)
            .await?
            .filter(|activity| self.is_active(activity, now)))
    }

    /// The most recent `history_limit` messages, oldest first, as model input.
    ///
    /// Tool results at the head of the window whose invocation record fell
    /// outside it are dropped; the model rejects unmatched results.
    pub async fn load_history(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, CinebotError> {
        let stored = recent_messages(&self.db, conversation_id, self.history_limit).await?;
        let orphans = stored
            .iter()
            .take_while(|m| m.role == ChatRole::Tool)
            .count();
        if orphans > 0 {
            warn!(
                conversation_id = %conversation_id,
                dropped = orphans,
                "dropping tool results cut off from their invocation"
            );
        }
        Ok(stored.iter().skip(orphans).map(to_chat_message).collect())
    }

    /// Every stored message of a conversation.
    pub async fn session_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, CinebotError> {
        conversation_messages(&self.db, conversation_id).await
    }

    /// Persist a finished turn atomically.
    pub async fn commit(&self, write: TurnWrite) -> Result<(), CinebotError> {
        commit_turn(&self.db, write).await
    }
}

/// Rebuild a model-facing message from a stored row.
pub fn to_chat_message(stored: &StoredMessage) -> ChatMessage {
    let meta = stored.metadata.as_ref();
    let text_field = |key: &str| {
        meta.and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let tool_calls = meta
        .and_then(|m| m.get("tool_calls"))
        .and_then(|calls| serde_json::from_value::<Vec<ToolCall>>(calls.clone()).ok())
        .filter(|calls| !calls.is_empty());

    ChatMessage {
        role: stored.role,
        content: stored.content.clone(),
        tool_calls,
        tool_call_id: text_field("tool_call_id"),
        name: text_field("name"),
    }
}

/// A guest's client-side history split into model input and tool outputs.
#[derive(Debug, Clone, Default)]
pub struct GuestContext {
    pub messages: Vec<ChatMessage>,
    /// Texts of `tool` entries, oldest first. They carry no correlation id
    /// and are never replayed to the model.
    pub tool_results: Vec<String>,
}

/// Translate a guest's client-side history. Unknown senders and empty texts
/// are skipped.
pub fn guest_history(entries: &[GuestEntry]) -> GuestContext {
    let mut context = GuestContext::default();
    for entry in entries.iter().filter(|e| !e.text.trim().is_empty()) {
        match entry.sender.as_str() {
            "user" => context.messages.push(ChatMessage::user(entry.text.clone())),
            "bot" | "assistant" => context.messages.push(ChatMessage::assistant(entry.text.clone())),
            "tool" => context.tool_results.push(entry.text.clone()),
            other => debug!(sender = %other, "skipping guest history entry"),
        }
    }
    context
}

/// Writes of one turn, in order, waiting for commit.
#[derive(Debug, Default)]
pub struct TurnJournal {
    messages: Vec<NewMessage>,
}

impl TurnJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, message: &ChatMessage, at: DateTime<Utc>) {
        self.record_with(message, None, at);
    }

    /// Record a message with extra metadata merged over its own.
    pub fn record_with(&mut self, message: &ChatMessage, extra: Option<Value>, at: DateTime<Utc>) {
        let mut meta = Map::new();
        if let Some(calls) = message.tool_calls.as_ref().filter(|c| !c.is_empty()) {
            meta.insert("tool_calls".into(), json!(calls));
        }
        if let Some(id) = &message.tool_call_id {
            meta.insert("tool_call_id".into(), json!(id));
        }
        if let Some(name) = &message.name {
            meta.insert("name".into(), json!(name));
        }
        if let Some(Value::Object(extra)) = extra {
            meta.extend(extra);
        }

        self.messages.push(NewMessage {
            role: message.role,
            content: message.content.clone(),
            metadata: (!meta.is_empty()).then_some(Value::Object(meta)),
            created_at: at.format(TIMESTAMP_FORMAT).to_string(),
        });
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_write(self, conversation_id: String, user: Identity, stage: DialogueStage) -> TurnWrite {
        TurnWrite {
            conversation_id,
            user,
            stage,
            messages: self.messages,
        }
    }
}
