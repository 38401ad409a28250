// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Movies showing at one cinema on a day.

use async_trait::async_trait;
use serde_json::{Value, json};

use cinebot_core::CinebotError;
use cinebot_storage::Database;
use cinebot_storage::queries::catalog::movies_at_cinema;

use crate::dates::{DateResolver, format_instant};
use crate::tool::{Tool, ToolContext, ToolId, ToolOutcome, str_arg};

pub const ASK_CINEMA: &str = "Bạn muốn xem danh sách phim tại rạp nào?";

pub struct MoviesAtCinemaTool {
    db: Database,
    dates: DateResolver,
}

impl MoviesAtCinemaTool {
    pub fn new(db: Database, dates: DateResolver) -> Self {
        Self { db, dates }
    }
}

#[async_trait]
impl Tool for MoviesAtCinemaTool {
    fn id(&self) -> ToolId {
        ToolId::GetMoviesAtCinema
    }

    fn description(&self) -> &str {
        "Lấy danh sách các BỘ PHIM đang được chiếu tại một RẠP PHIM cụ thể vào một NGÀY cụ thể."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "cinema_name": {
                    "type": "string",
                    "description": "Tên rạp phim, ví dụ: 'CGV Giga Mall', 'CGV Vincom Center'"
                },
                "date": {
                    "type": "string",
                    "description": "Ngày cần tra cứu, ví dụ: 'hôm nay', 'ngày mai'"
                }
            }
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<ToolOutcome, CinebotError> {
        let Some(cinema) = str_arg(args, "cinema_name") else {
            return Ok(ToolOutcome::Clarification(ASK_CINEMA.to_string()));
        };
        let date = self.dates.resolve(str_arg(args, "date").as_deref(), ctx.now);
        let (from, until) = self.dates.day_bounds(date);

        let rows = movies_at_cinema(
            &self.db,
            &cinema,
            &format_instant(from),
            &format_instant(until),
            &format_instant(ctx.now),
        )
        .await?;
        if rows.is_empty() {
            return Ok(ToolOutcome::Empty(format!(
                "Không tìm thấy phim nào đang chiếu tại '{cinema}' vào ngày {date}."
            )));
        }
        ToolOutcome::rows(&rows)
    }
}
