// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A small, fixed catalog and clock for tests.
//!
//! Tests run at [`anchor`], 2026-10-20 09:00 in UTC+7. The catalog holds:
//!
//! | showtime | movie | cinema | local start |
//! |----------|-------|--------|-------------|
//! | `mai_vincom_1230` | Mai | CGV Vincom Center (Hà Nội) | 10-20 12:30 |
//! | `mai_vincom_1345` | Mai | CGV Vincom Center (Hà Nội) | 10-20 13:45 |
//! | `mai_aeon_1345` | Mai | CGV Aeon Long Biên (Hà Nội) | 10-20 13:45 |
//! | `lat_mat_giga` | Lật Mặt 7 | CGV Giga Mall (Hồ Chí Minh) | 10-21 18:00 |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;

use cinebot_core::{CinebotError, Identity};
use cinebot_storage::queries::catalog::{insert_cinema, insert_movie, insert_policy, insert_showtime};
use cinebot_storage::{Database, NewMovie, NewShowtime};
use cinebot_tools::{RecommendationReply, RecommendationSource};

/// Ticket price of every seeded showtime.
pub const TICKET_PRICE: f64 = 95_000.0;

/// Capacity of every seeded showtime.
pub const SEATS_PER_SHOWTIME: i64 = 100;

/// 2026-10-20T02:00:00Z, which is 09:00 in UTC+7.
pub fn anchor() -> DateTime<Utc> {
    DateTime::from_timestamp(1_792_461_600, 0).unwrap_or_default()
}

/// A signed-in test user.
pub fn user(id: i64) -> Identity {
    Identity {
        user_id: id,
        name: format!("Khán giả {id}"),
        email: format!("user{id}@example.com"),
    }
}

/// Ids of the seeded rows.
#[derive(Debug, Clone, Copy)]
pub struct SeededCatalog {
    pub mai: i64,
    pub lat_mat: i64,
    pub mai_vincom_1230: i64,
    pub mai_vincom_1345: i64,
    pub mai_aeon_1345: i64,
    pub lat_mat_giga: i64,
}

/// Insert the fixed catalog described in the module docs.
pub async fn seed_catalog(db: &Database) -> Result<SeededCatalog, CinebotError> {
    let mai = insert_movie(
        db,
        NewMovie {
            title: "Mai".into(),
            description: Some("Câu chuyện về người phụ nữ tên Mai.".into()),
            genre: Some("Tâm lý".into()),
            rating: Some(8.1),
            director: Some("Trấn Thành".into()),
            cast_members: Some("Phương Anh Đào, Tuấn Trần".into()),
            duration_minutes: Some(131),
            release_date: Some("2026-02-10".into()),
            features: Some("2D".into()),
        },
    )
    .await?;
    let lat_mat = insert_movie(
        db,
        NewMovie {
            title: "Lật Mặt 7".into(),
            genre: Some("Gia đình".into()),
            director: Some("Lý Hải".into()),
            release_date: Some("2026-04-26".into()),
            features: Some("IMAX, 3D".into()),
            ..NewMovie::default()
        },
    )
    .await?;

    let vincom = insert_cinema(db, "CGV Vincom Center", "Hà Nội", Some("191 Bà Triệu")).await?;
    let aeon = insert_cinema(db, "CGV Aeon Long Biên", "Hà Nội", None).await?;
    let giga = insert_cinema(db, "CGV Giga Mall", "Hồ Chí Minh", None).await?;

    let showtime = |movie_id, cinema_id, start: &str| NewShowtime {
        movie_id,
        cinema_id,
        start_time: start.to_string(),
        ticket_price: TICKET_PRICE,
        available_seats: SEATS_PER_SHOWTIME,
    };
    let mai_vincom_1230 = insert_showtime(db, showtime(mai, vincom, "2026-10-20T05:30:00Z")).await?;
    let mai_vincom_1345 = insert_showtime(db, showtime(mai, vincom, "2026-10-20T06:45:00Z")).await?;
    let mai_aeon_1345 = insert_showtime(db, showtime(mai, aeon, "2026-10-20T06:45:00Z")).await?;
    let lat_mat_giga = insert_showtime(db, showtime(lat_mat, giga, "2026-10-21T11:00:00Z")).await?;

    insert_policy(
        db,
        "regulation",
        "Thú cưng",
        "Khách hàng không được mang thú cưng vào rạp.",
    )
    .await?;

    Ok(SeededCatalog {
        mai,
        lat_mat,
        mai_vincom_1230,
        mai_vincom_1345,
        mai_aeon_1345,
        lat_mat_giga,
    })
}

/// Recommendation source that always suggests "Lật Mặt 7".
pub struct StaticRecommender;

#[async_trait]
impl RecommendationSource for StaticRecommender {
    async fn recommend(&self, _user_id: i64) -> Result<RecommendationReply, CinebotError> {
        Ok(RecommendationReply::Movies(vec![
            json!({"title": "Lật Mặt 7", "genre": "Gia đình"}),
        ]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_is_nine_in_the_morning_local() {
        assert_eq!(anchor().to_rfc3339(), "2026-10-20T02:00:00+00:00");
    }

    #[tokio::test]
    async fn seeds_four_showtimes() {
        let db = Database::open_in_memory().await.unwrap();
        let seeded = seed_catalog(&db).await.unwrap();
        assert_ne!(seeded.mai_vincom_1345, seeded.mai_aeon_1345);
        let seats = cinebot_storage::queries::bookings::available_seats(&db, seeded.lat_mat_giga)
            .await
            .unwrap();
        assert_eq!(seats, Some(SEATS_PER_SHOWTIME));
    }
}
