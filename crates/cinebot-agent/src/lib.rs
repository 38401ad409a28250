// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialogue engine for the Cinebot booking assistant.
//!
//! The [`ChatEngine`] is the central coordinator that:
//! - Resolves or allocates the caller's session ([`context`])
//! - Picks the dialogue stage of the turn ([`stage`])
//! - Runs model-proposed tool calls concurrently ([`dispatcher`])
//! - Resolves a showtime choice in the confirmation stage ([`confirmation`])
//! - Commits all writes of a turn in one transaction

pub mod confirmation;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod prompt;
pub mod stage;

pub use confirmation::Confirmation;
pub use context::{ContextStore, GuestEntry, TurnJournal};
pub use dispatcher::{ToolBatch, ToolDispatcher};
pub use engine::{
    ChatEngine, ChatReply, ChatTurn, ConversationHistory, EngineSettings, HistoryEntry,
};
