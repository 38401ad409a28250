// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine testing.
//!
//! `TestHarness` assembles a `ChatEngine` over a temp SQLite database with
//! the fixture catalog, the built-in tools and a scripted provider.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use cinebot_agent::{ChatEngine, ChatReply, ChatTurn, EngineSettings, GuestEntry};
use cinebot_core::{CinebotError, Identity};
use cinebot_storage::Database;
use cinebot_tools::builtin::register_builtins;
use cinebot_tools::{DateResolver, RecommendationSource, ToolRegistry};

use crate::fixtures::{SeededCatalog, StaticRecommender, anchor, seed_catalog};
use crate::mock_provider::MockProvider;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    settings: EngineSettings,
    recommender: Arc<dyn RecommendationSource>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: EngineSettings::default(),
            recommender: Arc::new(StaticRecommender),
        }
    }

    /// Set the number of stored messages replayed to the model.
    pub fn with_history_limit(mut self, limit: u32) -> Self {
        self.settings.history_limit = limit;
        self
    }

    /// Set the session inactivity window.
    pub fn with_inactivity(mut self, window: Duration) -> Self {
        self.settings.inactivity = window;
        self
    }

    /// Replace the built-in persona line.
    pub fn with_prompt_header(mut self, header: &str) -> Self {
        self.settings.prompt_header = Some(header.to_string());
        self
    }

    pub fn with_recommender(mut self, source: Arc<dyn RecommendationSource>) -> Self {
        self.recommender = source;
        self
    }

    /// Build the test harness, creating all required subsystems.
    pub async fn build(self) -> Result<TestHarness, CinebotError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| CinebotError::Storage { source: e.into() })?;
        let db = Database::open(temp_dir.path().join("test.db"), 5_000).await?;
        let catalog = seed_catalog(&db).await?;

        let dates = DateResolver::default();
        let mut registry = ToolRegistry::new();
        register_builtins(&mut registry, &db, dates, self.recommender);

        let provider = Arc::new(MockProvider::new());
        let engine = Arc::new(ChatEngine::new(
            db.clone(),
            provider.clone(),
            Arc::new(registry),
            dates,
            self.settings,
        ));

        Ok(TestHarness {
            provider,
            engine,
            db,
            catalog,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with a mock provider and temp storage.
pub struct TestHarness {
    /// The scripted model.
    pub provider: Arc<MockProvider>,
    pub engine: Arc<ChatEngine>,
    /// Temp database, removed on drop.
    pub db: Database,
    /// Ids of the fixture catalog rows.
    pub catalog: SeededCatalog,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default settings.
    pub async fn new() -> Result<Self, CinebotError> {
        Self::builder().build().await
    }

    /// Send a signed-in message at the fixture anchor time.
    pub async fn say(
        &self,
        user: &Identity,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<ChatReply, CinebotError> {
        self.say_at(user, conversation_id, message, anchor()).await
    }

    /// Send a signed-in message at `now`.
    pub async fn say_at(
        &self,
        user: &Identity,
        conversation_id: Option<&str>,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatReply, CinebotError> {
        let turn = ChatTurn {
            message: message.to_string(),
            conversation_id: conversation_id.map(str::to_string),
            history: Vec::new(),
            caller: Some(user.clone()),
        };
        self.engine.handle_turn_at(turn, now).await
    }

    /// Send a guest message carrying client-side history.
    pub async fn guest_say(&self, history: Vec<GuestEntry>, message: &str) -> Result<ChatReply, CinebotError> {
        let turn = ChatTurn {
            message: message.to_string(),
            history,
            ..ChatTurn::default()
        };
        self.engine.handle_turn_at(turn, anchor()).await
    }
}
