// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every Cinebot crate.

use thiserror::Error;

/// Why a booking attempt was refused.
///
/// Every variant means the booking transaction was rolled back in full.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingRejection {
    /// One or more requested seats already belong to a committed booking.
    #[error("seats already booked: {}", seats.join(", "))]
    Conflict { seats: Vec<String> },

    /// The showtime does not exist.
    #[error("showtime not found")]
    ShowtimeNotFound,

    /// The request itself is malformed (no seats, blank or repeated seat ids).
    #[error("invalid booking request: {0}")]
    InvalidRequest(String),
}

/// The primary error type used across Cinebot crates.
#[derive(Debug, Error)]
pub enum CinebotError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Language-model provider errors (HTTP failure, rate limiting, malformed completion).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The external recommendation service failed or returned garbage.
    #[error("recommendation service error: {message}")]
    Recommendation {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A tool could not run (bad arguments, unknown tool).
    #[error("tool `{tool}` failed: {message}")]
    Tool { tool: String, message: String },

    /// A booking was refused.
    #[error(transparent)]
    Booking(#[from] BookingRejection),

    /// The caller must be signed in for this operation.
    #[error("authentication required")]
    Unauthorized,

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CinebotError {
    /// Shorthand for a provider error without an underlying source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }
}
