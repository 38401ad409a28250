// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dialogue stage detection.
//!
//! The stage persisted on a conversation is authoritative. Guests have no
//! persisted stage, so for them it is inferred from the assistant message
//! that preceded the current user message.

use cinebot_core::{ChatMessage, ChatRole, DialogueStage};

/// Assistant phrasings that ask the user to pick a showtime.
pub const CONFIRMATION_PHRASES: &[&str] = &[
    "suất nào",
    "chọn suất này không",
    "tôi không hiểu lựa chọn của bạn",
    "which showtime",
    "do you want this showtime",
    "didn't understand your choice",
];

fn asks_for_choice(text: &str) -> bool {
    let folded = text.to_lowercase();
    CONFIRMATION_PHRASES.iter().any(|p| folded.contains(p))
}

/// Stage of the turn whose user message ends `history`.
///
/// Looks only at the last two messages: the current user message and the
/// assistant message right before it.
pub fn classify(history: &[ChatMessage]) -> DialogueStage {
    match history {
        [.., prev, last]
            if last.role == ChatRole::User
                && prev.role == ChatRole::Assistant
                && asks_for_choice(prev.text()) =>
        {
            DialogueStage::AwaitingConfirmation
        }
        _ => DialogueStage::Discovery,
    }
}

/// Stage to persist after sending `reply`.
pub fn stage_after_reply(reply: &str) -> DialogueStage {
    if asks_for_choice(reply) {
        DialogueStage::AwaitingConfirmation
    } else {
        DialogueStage::Discovery
    }
}
