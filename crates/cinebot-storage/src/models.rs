// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types returned by the query modules.

use cinebot_core::{ChatRole, DialogueStage, Identity};
use serde::{Deserialize, Serialize};

/// Timestamp format for conversation rows: UTC with millisecond precision,
/// so lexical order equals time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Format of `showtimes.start_time`.
pub const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Rewrite an instant into [`START_TIME_FORMAT`] so that lexical order is
/// time order. Accepts RFC 3339 with any offset, or a bare
/// `YYYY-MM-DD[T ]HH:MM:SS` taken as UTC.
pub fn normalize_start_time(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let utc = match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&chrono::Utc),
        Err(_) => ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(raw, fmt).ok())?
            .and_utc(),
    };
    Some(utc.format(START_TIME_FORMAT).to_string())
}

/// Current time in [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One showtime as presented to the model and carried as a booking candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowtimeRow {
    pub showtime_id: i64,
    /// UTC instant, [`START_TIME_FORMAT`].
    pub start_time: String,
    pub ticket_price: f64,
    pub cinema_name: String,
    pub city: String,
    pub movie_id: i64,
    pub title: String,
    pub features: Option<String>,
}

/// A movie showing at a cinema on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieAtCinemaRow {
    pub title: String,
    pub genre: Option<String>,
    pub showtime_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub movie_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<f64>,
    pub director: Option<String>,
    pub cast_members: Option<String>,
    pub duration_minutes: Option<i64>,
    pub release_date: Option<String>,
    pub features: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyRow {
    pub policy_id: i64,
    pub category: String,
    pub title: String,
    pub content: String,
}

/// Names the dialogue engine puts into the discovery-stage prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSnapshot {
    /// Titles already released as of the snapshot date.
    pub now_showing: Vec<String>,
    pub cities: Vec<String>,
    pub cinemas: Vec<String>,
}

/// Insert payloads for catalog rows.
#[derive(Debug, Clone, Default)]
pub struct NewMovie {
    pub title: String,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub rating: Option<f64>,
    pub director: Option<String>,
    pub cast_members: Option<String>,
    pub duration_minutes: Option<i64>,
    pub release_date: Option<String>,
    pub features: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewShowtime {
    pub movie_id: i64,
    pub cinema_id: i64,
    /// UTC instant, [`START_TIME_FORMAT`].
    pub start_time: String,
    pub ticket_price: f64,
    pub available_seats: i64,
}

/// A conversation header plus the time of its latest message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationActivity {
    pub conversation_id: String,
    pub user_id: i64,
    pub stage: DialogueStage,
    /// `None` when the conversation has no messages yet.
    pub last_message_at: Option<String>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    pub message_id: i64,
    pub conversation_id: String,
    pub role: ChatRole,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

/// A message waiting to be written as part of a turn.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub role: ChatRole,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

/// Everything one authenticated turn writes, committed atomically.
#[derive(Debug, Clone)]
pub struct TurnWrite {
    pub conversation_id: String,
    pub user: Identity,
    /// Stage to persist on the conversation after this turn.
    pub stage: DialogueStage,
    pub messages: Vec<NewMessage>,
}

/// Request to reserve seats for one showtime.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user: Identity,
    pub showtime_id: i64,
    pub seats: Vec<String>,
}

/// A committed booking joined with its showtime for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSummary {
    pub booking_id: i64,
    pub showtime_id: i64,
    pub title: String,
    pub cinema_name: String,
    pub start_time: String,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub created_at: String,
}
