// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation log reads. Canonical order is `created_at, message_id`.

use std::str::FromStr;

use cinebot_core::{ChatRole, CinebotError};
use rusqlite::params;
use rusqlite::types::Type;

use crate::database::{Database, map_tr_err};
use crate::models::StoredMessage;

fn message_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let role: String = row.get(2)?;
    let metadata: Option<String> = row.get(4)?;
    Ok(StoredMessage {
        message_id: row.get(0)?,
        conversation_id: row.get(1)?,
        role: ChatRole::from_str(&role)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(e)))?,
        content: row.get(3)?,
        metadata: metadata
            .map(|m| serde_json::from_str(&m))
            .transpose()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
        created_at: row.get(5)?,
    })
}

/// The most recent `limit` messages of a conversation, oldest first.
pub async fn recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: u32,
) -> Result<Vec<StoredMessage>, CinebotError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT message_id, conversation_id, role, content, metadata, created_at
                 FROM chat_messages WHERE conversation_id = ?1
                 ORDER BY created_at DESC, message_id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![conversation_id, limit], message_from_row)?;
            let mut messages = rows.collect::<Result<Vec<_>, _>>()?;
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Every message of a conversation, oldest first.
pub async fn conversation_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<StoredMessage>, CinebotError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT message_id, conversation_id, role, content, metadata, created_at
                 FROM chat_messages WHERE conversation_id = ?1
                 ORDER BY created_at ASC, message_id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], message_from_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewMessage, TurnWrite};
    use crate::queries::conversations::commit_turn;
    use cinebot_core::{DialogueStage, Identity};
    use serde_json::json;

    async fn seeded() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let messages = (0..6)
            .map(|i| NewMessage {
                role: if i % 2 == 0 {
                    ChatRole::User
                } else {
                    ChatRole::Assistant
                },
                content: Some(format!("m{i}")),
                metadata: (i == 5).then(|| json!({"booking_data": [{"showtime_id": 3}]})),
                // Two messages share a timestamp; message_id breaks the tie.
                created_at: format!("2026-10-19T01:00:0{}.000Z", i.min(4)),
            })
            .collect();
        commit_turn(
            &db,
            TurnWrite {
                conversation_id: "c1".into(),
                user: Identity {
                    user_id: 1,
                    name: "An".into(),
                    email: "an@example.com".into(),
                },
                stage: DialogueStage::Discovery,
                messages,
            },
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn recent_messages_returns_tail_in_ascending_order() {
        let db = seeded().await;
        let tail = recent_messages(&db, "c1", 3).await.unwrap();
        let texts: Vec<_> = tail.iter().map(|m| m.content.clone().unwrap()).collect();
        assert_eq!(texts, vec!["m3", "m4", "m5"]);
        assert_eq!(tail[2].role, ChatRole::Assistant);
        assert_eq!(
            tail[2].metadata,
            Some(json!({"booking_data": [{"showtime_id": 3}]}))
        );
    }

    #[tokio::test]
    async fn conversation_messages_returns_everything() {
        let db = seeded().await;
        let all = conversation_messages(&db, "c1").await.unwrap();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].content.as_deref(), Some("m0"));
        assert!(conversation_messages(&db, "other").await.unwrap().is_empty());
    }
}
