// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Date resolution, the tool contract and registry, and the catalog query
//! tools offered to the language model.
//!
//! Query tools:
//! - [`builtin::ShowtimesTool`] -- showtimes of a movie on a day
//! - [`builtin::MoviesAtCinemaTool`] -- movies showing at a cinema
//! - [`builtin::MovieDetailsTool`] -- details of one movie
//! - [`builtin::RecommendationsTool`] -- personalized recommendations
//! - [`builtin::PolicySearchTool`] -- regulations and payment policies

pub mod builtin;
pub mod dates;
pub mod recommender;
pub mod tool;

pub use dates::DateResolver;
pub use recommender::{HttpRecommender, RecommendationReply, RecommendationSource};
pub use tool::{Tool, ToolContext, ToolId, ToolOutcome, ToolRegistry};
