// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plot, cast, and other details of one movie.

use async_trait::async_trait;
use serde_json::{Value, json};

use cinebot_core::CinebotError;
use cinebot_storage::Database;
use cinebot_storage::queries::catalog::movie_details;

use crate::tool::{Tool, ToolContext, ToolId, ToolOutcome, str_arg};

pub const ASK_TITLE: &str = "Bạn muốn xem thông tin của phim nào?";

pub struct MovieDetailsTool {
    db: Database,
}

impl MovieDetailsTool {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for MovieDetailsTool {
    fn id(&self) -> ToolId {
        ToolId::GetMovieDetails
    }

    fn description(&self) -> &str {
        "Lấy thông tin chi tiết (cốt truyện, diễn viên, đạo diễn, thể loại) của một BỘ PHIM cụ thể."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "movie_title": {
                    "type": "string",
                    "description": "Tên bộ phim, ví dụ: 'Mai'"
                }
            }
        })
    }

    async fn execute(&self, args: &Value, _ctx: &ToolContext) -> Result<ToolOutcome, CinebotError> {
        let Some(title) = str_arg(args, "movie_title") else {
            return Ok(ToolOutcome::Clarification(ASK_TITLE.to_string()));
        };
        match movie_details(&self.db, &title).await? {
            Some(details) => serde_json::to_value(details)
                .map(ToolOutcome::Record)
                .map_err(|e| CinebotError::Internal(format!("movie details serialization: {e}"))),
            None => Ok(ToolOutcome::Empty(format!(
                "Không tìm thấy thông tin cho phim '{title}'."
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{guest_at_morning, seeded_db};

    #[tokio::test]
    async fn finds_movie_case_insensitively() {
        let tool = MovieDetailsTool::new(seeded_db().await);
        let ToolOutcome::Record(record) = tool
            .execute(&json!({"movie_title": "MAI"}), &guest_at_morning())
            .await
            .unwrap()
        else {
            panic!("expected a record");
        };
        assert_eq!(record["title"], "Mai");
        assert_eq!(record["director"], "Trấn Thành");
    }

    #[tokio::test]
    async fn unknown_movie_and_missing_title() {
        let tool = MovieDetailsTool::new(seeded_db().await);
        assert_eq!(
            tool.execute(&json!({"movie_title": "Oppenheimer"}), &guest_at_morning())
                .await
                .unwrap(),
            ToolOutcome::Empty("Không tìm thấy thông tin cho phim 'Oppenheimer'.".into())
        );
        assert_eq!(
            tool.execute(&json!({}), &guest_at_morning()).await.unwrap(),
            ToolOutcome::Clarification(ASK_TITLE.into())
        );
    }
}
