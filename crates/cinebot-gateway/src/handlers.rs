// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use cinebot_agent::{ChatReply, ChatTurn, ConversationHistory, GuestEntry};
use cinebot_core::{HealthStatus, PluginAdapter};
use cinebot_storage::queries::bookings::{bookings_for_user, create_booking, occupied_seats};
use cinebot_storage::{BookingRequest, BookingSummary};

use crate::auth::Caller;
use crate::error::{ApiError, INCOMPLETE_BOOKING};
use crate::server::GatewayState;

pub const EMPTY_MESSAGE: &str = "Tin nhắn không được để trống.";
pub const BOOKING_CREATED: &str = "Đặt vé thành công!";

/// Request body for POST /api/chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Client-side history, only read for guests.
    #[serde(default)]
    pub history: Vec<GuestEntry>,
}

/// Request body for POST /api/bookings.
#[derive(Debug, Deserialize)]
pub struct BookingBody {
    pub showtime_id: i64,
    #[serde(default)]
    pub seats: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BookingCreated {
    pub message: String,
    pub booking_id: i64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// POST /api/chat
pub async fn post_chat(
    State(state): State<GatewayState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(body) = body?;
    if body.message.trim().is_empty() {
        return Err(ApiError::BadRequest(EMPTY_MESSAGE.to_string()));
    }
    let turn = ChatTurn {
        message: body.message,
        conversation_id: body.conversation_id,
        history: body.history,
        caller: caller.0,
    };
    let reply = state.engine.handle_turn(turn).await?;
    Ok(Json(reply))
}

/// GET /api/chat/history
pub async fn get_chat_history(
    State(state): State<GatewayState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ConversationHistory>, ApiError> {
    let user = caller.require()?;
    Ok(Json(state.engine.history(user).await?))
}

/// POST /api/bookings
pub async fn post_booking(
    State(state): State<GatewayState>,
    Extension(caller): Extension<Caller>,
    body: Result<Json<BookingBody>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingCreated>), ApiError> {
    let user = caller.require()?.clone();
    // A missing or mistyped showtime id is an incomplete booking.
    let Json(body) = body.map_err(|_| ApiError::BadRequest(INCOMPLETE_BOOKING.to_string()))?;
    let user_id = user.user_id;
    let booking_id = create_booking(
        &state.db,
        BookingRequest {
            user,
            showtime_id: body.showtime_id,
            seats: body.seats,
        },
    )
    .await?;
    info!(user_id, booking_id, showtime_id = body.showtime_id, "booking created");
    Ok((
        StatusCode::CREATED,
        Json(BookingCreated {
            message: BOOKING_CREATED.to_string(),
            booking_id,
        }),
    ))
}

/// GET /api/showtimes/{id}/occupied-seats
pub async fn get_occupied_seats(
    State(state): State<GatewayState>,
    Path(showtime_id): Path<i64>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(occupied_seats(&state.db, showtime_id).await?))
}

/// GET /api/users/bookings
pub async fn get_user_bookings(
    State(state): State<GatewayState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<BookingSummary>>, ApiError> {
    let user = caller.require()?;
    Ok(Json(bookings_for_user(&state.db, user.user_id).await?))
}

/// GET /health
///
/// Unauthenticated. Reports `degraded` when the database check fails.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    let status = match state.db.health_check().await {
        Ok(HealthStatus::Healthy) => "ok",
        _ => "degraded",
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.started.elapsed().as_secs(),
    })
}
