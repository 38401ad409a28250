// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation headers and the atomic per-turn write.

use std::str::FromStr;

use cinebot_core::{CinebotError, DialogueStage};
use rusqlite::types::Type;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

use crate::database::{Database, map_tr_err};
use crate::models::{ConversationActivity, TurnWrite, now_timestamp};
use crate::queries::users::ensure_user;

const ACTIVITY_SELECT: &str = "SELECT c.conversation_id, c.user_id, c.stage,
        (SELECT MAX(m.created_at) FROM chat_messages m
          WHERE m.conversation_id = c.conversation_id) AS last_message_at
 FROM conversations c";

fn activity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationActivity> {
    let stage: String = row.get(2)?;
    Ok(ConversationActivity {
        conversation_id: row.get(0)?,
        user_id: row.get(1)?,
        stage: DialogueStage::from_str(&stage)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        last_message_at: row.get(3)?,
    })
}

/// The conversation with this id, if it exists.
pub async fn find_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<ConversationActivity>, CinebotError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<ConversationActivity>, rusqlite::Error> {
            conn.query_row(
                &format!("{ACTIVITY_SELECT} WHERE c.conversation_id = ?1"),
                params![conversation_id],
                activity_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// The user's conversation with the newest message, if any.
pub async fn latest_conversation(
    db: &Database,
    user_id: i64,
) -> Result<Option<ConversationActivity>, CinebotError> {
    db.connection()
        .call(move |conn| -> Result<Option<ConversationActivity>, rusqlite::Error> {
            conn.query_row(
                &format!(
                    "{ACTIVITY_SELECT} WHERE c.user_id = ?1
                     ORDER BY last_message_at DESC, c.updated_at DESC LIMIT 1"
                ),
                params![user_id],
                activity_from_row,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Persist one turn in a single transaction: the conversation row (created
/// or stage-updated), then every message in order.
///
/// Nothing is written if any statement fails.
pub async fn commit_turn(db: &Database, turn: TurnWrite) -> Result<(), CinebotError> {
    let conversation_id = turn.conversation_id.clone();
    let count = turn.messages.len();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            ensure_user(&tx, &turn.user)?;
            let now = now_timestamp();
            tx.execute(
                "INSERT INTO conversations (conversation_id, user_id, stage, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(conversation_id) DO UPDATE
                 SET stage = excluded.stage, updated_at = excluded.updated_at",
                params![
                    turn.conversation_id,
                    turn.user.user_id,
                    turn.stage.to_string(),
                    now
                ],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO chat_messages
                        (conversation_id, user_id, role, content, metadata, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )?;
                for message in &turn.messages {
                    insert.execute(params![
                        turn.conversation_id,
                        turn.user.user_id,
                        message.role.to_string(),
                        message.content,
                        message.metadata.as_ref().map(|m| m.to_string()),
                        message.created_at,
                    ])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)?;
    debug!(conversation_id = %conversation_id, messages = count, "turn committed");
    Ok(())
}
