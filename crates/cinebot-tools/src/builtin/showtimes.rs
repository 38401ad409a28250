// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Showtimes of a movie on a day, at a city or cinema.

use async_trait::async_trait;
use serde_json::{Value, json};

use cinebot_core::CinebotError;
use cinebot_storage::Database;
use cinebot_storage::queries::catalog::{ShowtimeFilter, showtimes_for_movie};

use crate::dates::{DateResolver, format_instant};
use crate::tool::{Tool, ToolContext, ToolId, ToolOutcome, str_arg};

pub const ASK_LOCATION: &str = "Bạn muốn xem phim ở thành phố hay rạp nào?";

pub struct ShowtimesTool {
    db: Database,
    dates: DateResolver,
}

impl ShowtimesTool {
    pub fn new(db: Database, dates: DateResolver) -> Self {
        Self { db, dates }
    }
}

#[async_trait]
impl Tool for ShowtimesTool {
    fn id(&self) -> ToolId {
        ToolId::GetShowtimesForMovie
    }

    fn description(&self) -> &str {
        "Lấy suất chiếu cho một BỘ PHIM, lọc theo NGÀY và (THÀNH PHỐ hoặc RẠP PHIM CỤ THỂ)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "movie_title": {
                    "type": "string",
                    "description": "Tên bộ phim, ví dụ: 'Mai'"
                },
                "date": {
                    "type": "string",
                    "description": "Ngày cần tra cứu, ví dụ: 'hôm nay', 'ngày mai', '15-11'. Nếu không có, mặc định là 'hôm nay'."
                },
                "city_name": {
                    "type": "string",
                    "description": "Tên thành phố (nếu người dùng cung cấp). Ví dụ: 'Đà Nẵng'"
                },
                "cinema_name": {
                    "type": "string",
                    "description": "Tên rạp phim cụ thể (nếu người dùng cung cấp). Ví dụ: 'CGV Vincom Center'"
                }
            }
        })
    }

    async fn execute(&self, args: &Value, ctx: &ToolContext) -> Result<ToolOutcome, CinebotError> {
        let date = self.dates.resolve(str_arg(args, "date").as_deref(), ctx.now);
        let city = str_arg(args, "city_name");
        let cinema = str_arg(args, "cinema_name");

        let Some(location) = cinema.clone().or_else(|| city.clone()) else {
            return Ok(ToolOutcome::Clarification(ASK_LOCATION.to_string()));
        };
        let Some(title) = str_arg(args, "movie_title") else {
            return Ok(ToolOutcome::Clarification(format!(
                "OK, tôi sẽ tra cứu tại {location}. Bạn muốn xem phim gì?"
            )));
        };

        let (from, until) = self.dates.day_bounds(date);
        let rows = showtimes_for_movie(
            &self.db,
            ShowtimeFilter {
                title: title.clone(),
                city,
                cinema,
                from: format_instant(from),
                until: format_instant(until),
                after: format_instant(ctx.now),
            },
        )
        .await?;

        if rows.is_empty() {
            return Ok(ToolOutcome::Empty(format!(
                "Rất tiếc, tôi không tìm thấy suất chiếu nào cho phim '{title}' tại '{location}' vào ngày {date}."
            )));
        }
        ToolOutcome::rows(&rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::test_support::{guest_at_morning, seeded_db};

    async fn run(args: Value) -> ToolOutcome {
        let tool = ShowtimesTool::new(seeded_db().await, DateResolver::default());
        tool.execute(&args, &guest_at_morning()).await.unwrap()
    }

    #[tokio::test]
    async fn missing_location_asks_for_it() {
        assert_eq!(
            run(json!({"movie_title": "Mai"})).await,
            ToolOutcome::Clarification(ASK_LOCATION.into())
        );
    }

    #[tokio::test]
    async fn missing_title_echoes_location() {
        assert_eq!(
            run(json!({"city_name": "Hà Nội"})).await,
            ToolOutcome::Clarification("OK, tôi sẽ tra cứu tại Hà Nội. Bạn muốn xem phim gì?".into())
        );
        assert_eq!(
            run(json!({"city_name": "Hà Nội", "cinema_name": "CGV Aeon"})).await,
            ToolOutcome::Clarification("OK, tôi sẽ tra cứu tại CGV Aeon. Bạn muốn xem phim gì?".into())
        );
    }

    #[tokio::test]
    async fn returns_only_future_showtimes_of_the_day() {
        let ToolOutcome::Rows(rows) = run(json!({"movie_title": "mai", "city_name": "hà nội"})).await
        else {
            panic!("expected rows");
        };
        let starts: Vec<_> = rows.iter().map(|r| r["start_time"].as_str().unwrap()).collect();
        // Aeon sorts before Vincom; the 01:00Z Vincom showtime has passed.
        assert_eq!(starts, vec!["2026-10-20T05:30:00Z", "2026-10-20T06:45:00Z"]);
        assert_eq!(rows[0]["cinema_name"], "CGV Aeon Long Biên");
        assert_eq!(rows[0]["features"], "2D");
    }

    #[tokio::test]
    async fn date_phrase_selects_the_day() {
        let ToolOutcome::Rows(rows) =
            run(json!({"movie_title": "Mai", "city_name": "Đà Nẵng", "date": "ngày mai"})).await
        else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn nothing_found_names_title_location_and_date() {
        assert_eq!(
            run(json!({"movie_title": "Mai", "cinema_name": "CGV Vincom Đà Nẵng"})).await,
            ToolOutcome::Empty(
                "Rất tiếc, tôi không tìm thấy suất chiếu nào cho phim 'Mai' tại 'CGV Vincom Đà Nẵng' vào ngày 2026-10-20."
                    .into()
            )
        );
    }
}
