// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the chat engine and seat bookings.
//!
//! Routing is thin: chat turns go straight to `ChatEngine`, bookings and
//! seat queries straight to the storage queries.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::{AuthConfig, Caller, issue_token, verify_token};
pub use error::ApiError;
pub use server::{GatewayState, ServerConfig, router, start_server};
