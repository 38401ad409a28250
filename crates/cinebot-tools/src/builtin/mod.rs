// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The catalog query tools offered to the model.

pub mod movie_details;
pub mod movies_at_cinema;
pub mod policies;
pub mod recommendations;
pub mod showtimes;

pub use movie_details::MovieDetailsTool;
pub use movies_at_cinema::MoviesAtCinemaTool;
pub use policies::PolicySearchTool;
pub use recommendations::RecommendationsTool;
pub use showtimes::ShowtimesTool;

use std::sync::Arc;

use cinebot_storage::Database;

use crate::ToolRegistry;
use crate::dates::DateResolver;
use crate::recommender::RecommendationSource;

/// Registers every query tool into the given registry.
pub fn register_builtins(
    registry: &mut ToolRegistry,
    db: &Database,
    dates: DateResolver,
    recommender: Arc<dyn RecommendationSource>,
) {
    registry.register(Arc::new(ShowtimesTool::new(db.clone(), dates)));
    registry.register(Arc::new(MoviesAtCinemaTool::new(db.clone(), dates)));
    registry.register(Arc::new(MovieDetailsTool::new(db.clone())));
    registry.register(Arc::new(RecommendationsTool::new(recommender)));
    registry.register(Arc::new(PolicySearchTool::new(db.clone())));
}
