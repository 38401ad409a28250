// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for the language-model completion capability.

use async_trait::async_trait;

use crate::error::CinebotError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CompletionRequest, CompletionResponse};

/// A chat-completion backend.
///
/// The dialogue engine treats it as a black box: one request in, one
/// assistant message out. Implementations must not retry internally.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, CinebotError>;
}
