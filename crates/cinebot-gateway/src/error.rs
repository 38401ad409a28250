// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of engine and storage errors onto HTTP responses.
//!
//! Bodies are always `{"message": "..."}` in Vietnamese. Internal details
//! are logged and never returned.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use cinebot_core::{BookingRejection, CinebotError};

pub const SIGN_IN_REQUIRED: &str = "Bạn cần đăng nhập để thực hiện thao tác này.";
pub const PROVIDER_FAILED: &str =
    "Lỗi từ nhà cung cấp AI. Có thể bạn đã vượt giới hạn (rate limit) hoặc prompt có vấn đề.";
pub const SERVER_FAILED: &str = "Lỗi server.";
pub const SHOWTIME_NOT_FOUND: &str = "Không tìm thấy suất chiếu.";
pub const INCOMPLETE_BOOKING: &str = "Vui lòng cung cấp đủ thông tin suất chiếu và ghế ngồi.";
pub const MALFORMED_BODY: &str = "Dữ liệu gửi lên không hợp lệ.";

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Engine(CinebotError),
}

impl From<CinebotError> for ApiError {
    fn from(e: CinebotError) -> Self {
        Self::Engine(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "rejected request body");
        Self::BadRequest(MALFORMED_BODY.to_string())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Engine(CinebotError::Booking(rejection)) => match rejection {
                BookingRejection::Conflict { seats } => (
                    StatusCode::CONFLICT,
                    format!("Ghế {} đã có người đặt. Vui lòng chọn ghế khác.", seats.join(", ")),
                ),
                BookingRejection::ShowtimeNotFound => {
                    (StatusCode::NOT_FOUND, SHOWTIME_NOT_FOUND.to_string())
                }
                BookingRejection::InvalidRequest(_) => {
                    (StatusCode::BAD_REQUEST, INCOMPLETE_BOOKING.to_string())
                }
            },
            Self::Engine(CinebotError::Unauthorized) => {
                (StatusCode::UNAUTHORIZED, SIGN_IN_REQUIRED.to_string())
            }
            Self::Engine(CinebotError::Provider { .. }) => {
                (StatusCode::INTERNAL_SERVER_ERROR, PROVIDER_FAILED.to_string())
            }
            Self::Engine(_) => (StatusCode::INTERNAL_SERVER_ERROR, SERVER_FAILED.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        match &self {
            Self::Engine(e) if status.is_server_error() => tracing::error!(error = %e, "request failed"),
            Self::Engine(e) => tracing::debug!(error = %e, status = %status, "request rejected"),
            Self::BadRequest(_) => {}
        }
        (status, Json(ErrorResponse { message })).into_response()
    }
}
