// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test utilities for cinebot integration tests.
//!
//! Provides a scripted provider, a fixed catalog and a harness that wires
//! them into a `ChatEngine`.

pub mod fixtures;
pub mod harness;
pub mod mock_provider;

pub use fixtures::{SeededCatalog, StaticRecommender, anchor, seed_catalog, user};
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, Scripted};
