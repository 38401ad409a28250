// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Cinebot, a conversational cinema booking assistant.
//!
//! Holds the workspace error type, the chat wire types shared by the
//! provider, the conversation log and the dialogue engine, and the adapter
//! traits external collaborators implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{BookingRejection, CinebotError};
pub use types::{
    AdapterType, ChatMessage, ChatRole, CompletionRequest, CompletionResponse, DialogueStage,
    HealthStatus, Identity, ResponseFormat, ToolCall, ToolSpec,
};

pub use traits::{PluginAdapter, ProviderAdapter};
