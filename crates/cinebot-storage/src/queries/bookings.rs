// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seat booking transaction and occupancy reads.
//!
//! [`create_booking`] is the only writer of `booked_seats`. It runs inside
//! `BEGIN IMMEDIATE`, which takes the database write lock before the seat
//! check and keeps it until commit, so two attempts on the same seat can
//! never both pass the check. `UNIQUE(showtime_id, seat_id)` backs that up.

use std::collections::HashSet;

use cinebot_core::{BookingRejection, CinebotError};
use rusqlite::{ErrorCode, OptionalExtension, TransactionBehavior, params};
use tracing::{info, warn};

use crate::database::{Database, map_tr_err};
use crate::models::{BookingRequest, BookingSummary, now_timestamp};
use crate::queries::users::ensure_user;

/// Trim seat ids and reject empty, blank, or repeated ones.
fn normalize_seats(seats: &[String]) -> Result<Vec<String>, BookingRejection> {
    if seats.is_empty() {
        return Err(BookingRejection::InvalidRequest(
            "at least one seat is required".into(),
        ));
    }
    let mut seen = HashSet::new();
    let mut normalized = Vec::with_capacity(seats.len());
    for seat in seats {
        let seat = seat.trim();
        if seat.is_empty() {
            return Err(BookingRejection::InvalidRequest(
                "seat ids must not be blank".into(),
            ));
        }
        if !seen.insert(seat.to_string()) {
            return Err(BookingRejection::InvalidRequest(format!(
                "seat {seat} is listed more than once"
            )));
        }
        normalized.push(seat.to_string());
    }
    Ok(normalized)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Reserve seats for a showtime and return the new booking id.
///
/// Either every seat is booked, the booking row is written, and the
/// showtime's available-seat counter drops by the seat count, or nothing
/// changes and a [`BookingRejection`] explains why.
pub async fn create_booking(db: &Database, request: BookingRequest) -> Result<i64, CinebotError> {
    let seats = normalize_seats(&request.seats)?;
    let showtime_id = request.showtime_id;
    let user = request.user;
    let user_id = user.user_id;
    let seat_count = seats.len();

    let outcome = db
        .connection()
        .call(
            move |conn| -> Result<Result<i64, BookingRejection>, rusqlite::Error> {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let mut taken = Vec::new();
                {
                    let mut check = tx.prepare(
                        "SELECT 1 FROM booked_seats WHERE showtime_id = ?1 AND seat_id = ?2",
                    )?;
                    for seat in &seats {
                        if check.exists(params![showtime_id, seat])? {
                            taken.push(seat.clone());
                        }
                    }
                }
                if !taken.is_empty() {
                    return Ok(Err(BookingRejection::Conflict { seats: taken }));
                }

                let price: Option<f64> = tx
                    .query_row(
                        "SELECT ticket_price FROM showtimes WHERE showtime_id = ?1",
                        params![showtime_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(price) = price else {
                    return Ok(Err(BookingRejection::ShowtimeNotFound));
                };
                let total = price * seats.len() as f64;

                ensure_user(&tx, &user)?;
                let seats_json = serde_json::to_string(&seats)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                tx.execute(
                    "INSERT INTO bookings (user_id, showtime_id, total_amount, seats, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![user.user_id, showtime_id, total, seats_json, now_timestamp()],
                )?;
                let booking_id = tx.last_insert_rowid();

                {
                    let mut insert = tx.prepare(
                        "INSERT INTO booked_seats (showtime_id, seat_id, booking_id)
                         VALUES (?1, ?2, ?3)",
                    )?;
                    for seat in &seats {
                        match insert.execute(params![showtime_id, seat, booking_id]) {
                            Ok(_) => {}
                            Err(e) if is_unique_violation(&e) => {
                                return Ok(Err(BookingRejection::Conflict {
                                    seats: vec![seat.clone()],
                                }));
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }

                tx.execute(
                    "UPDATE showtimes SET available_seats = available_seats - ?1
                     WHERE showtime_id = ?2",
                    params![seats.len() as i64, showtime_id],
                )?;
                tx.commit()?;
                Ok(Ok(booking_id))
            },
        )
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Ok(booking_id) => {
            info!(booking_id, showtime_id, user_id, seats = seat_count, "booking committed");
            Ok(booking_id)
        }
        Err(rejection) => {
            warn!(showtime_id, user_id, reason = %rejection, "booking rejected");
            Err(rejection.into())
        }
    }
}

/// Seat ids already booked for a showtime, sorted.
pub async fn occupied_seats(db: &Database, showtime_id: i64) -> Result<Vec<String>, CinebotError> {
    db.connection()
        .call(move |conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT seat_id FROM booked_seats WHERE showtime_id = ?1 ORDER BY seat_id",
            )?;
            let rows = stmt.query_map(params![showtime_id], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Remaining capacity of a showtime, or `None` if it does not exist.
pub async fn available_seats(db: &Database, showtime_id: i64) -> Result<Option<i64>, CinebotError> {
    db.connection()
        .call(move |conn| -> Result<Option<i64>, rusqlite::Error> {
            conn.query_row(
                "SELECT available_seats FROM showtimes WHERE showtime_id = ?1",
                params![showtime_id],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// A user's bookings, newest first.
pub async fn bookings_for_user(
    db: &Database,
    user_id: i64,
) -> Result<Vec<BookingSummary>, CinebotError> {
    db.connection()
        .call(move |conn| -> Result<Vec<BookingSummary>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT b.booking_id, b.showtime_id, m.title, c.name, s.start_time,
                        b.seats, b.total_amount, b.created_at
                 FROM bookings b
                 JOIN showtimes s ON s.showtime_id = b.showtime_id
                 JOIN movies m ON m.movie_id = s.movie_id
                 JOIN cinemas c ON c.cinema_id = s.cinema_id
                 WHERE b.user_id = ?1
                 ORDER BY b.created_at DESC, b.booking_id DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                let seats: String = row.get(5)?;
                Ok(BookingSummary {
                    booking_id: row.get(0)?,
                    showtime_id: row.get(1)?,
                    title: row.get(2)?,
                    cinema_name: row.get(3)?,
                    start_time: row.get(4)?,
                    seats: serde_json::from_str(&seats).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            5,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?,
                    total_amount: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewMovie, NewShowtime};
    use crate::queries::catalog::{insert_cinema, insert_movie, insert_showtime};
    use cinebot_core::Identity;
    use tempfile::tempdir;

    async fn showtime(db: &Database, seats: i64) -> i64 {
        let movie = insert_movie(
            db,
            NewMovie {
                title: "Mai".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let cinema = insert_cinema(db, "CGV Vincom Center", "Hà Nội", None)
            .await
            .unwrap();
        insert_showtime(
            db,
            NewShowtime {
                movie_id: movie,
                cinema_id: cinema,
                start_time: "2030-01-01T12:00:00Z".into(),
                ticket_price: 85000.0,
                available_seats: seats,
            },
        )
        .await
        .unwrap()
    }

    fn request(user_id: i64, showtime_id: i64, seats: &[&str]) -> BookingRequest {
        BookingRequest {
            user: Identity {
                user_id,
                name: format!("user{user_id}"),
                email: String::new(),
            },
            showtime_id,
            seats: seats.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn booking_records_seats_amount_and_capacity() {
        let db = Database::open_in_memory().await.unwrap();
        let st = showtime(&db, 50).await;

        let id = create_booking(&db, request(1, st, &[" H8 ", "H9"])).await.unwrap();
        assert!(id > 0);
        assert_eq!(occupied_seats(&db, st).await.unwrap(), vec!["H8", "H9"]);
        assert_eq!(available_seats(&db, st).await.unwrap(), Some(48));

        let mine = bookings_for_user(&db, 1).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].booking_id, id);
        assert_eq!(mine[0].seats, vec!["H8", "H9"]);
        assert_eq!(mine[0].total_amount, 170000.0);
        assert_eq!(mine[0].title, "Mai");
    }

    #[tokio::test]
    async fn conflict_names_every_taken_seat_and_writes_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let st = showtime(&db, 50).await;
        create_booking(&db, request(1, st, &["A1", "A2"])).await.unwrap();

        let err = create_booking(&db, request(2, st, &["A2", "A3", "A1"]))
            .await
            .unwrap_err();
        match err {
            CinebotError::Booking(BookingRejection::Conflict { seats }) => {
                assert_eq!(seats, vec!["A2", "A1"]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(occupied_seats(&db, st).await.unwrap(), vec!["A1", "A2"]);
        assert_eq!(available_seats(&db, st).await.unwrap(), Some(48));
        assert!(bookings_for_user(&db, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_showtime_is_not_found() {
        let db = Database::open_in_memory().await.unwrap();
        let err = create_booking(&db, request(1, 404, &["A1"])).await.unwrap_err();
        assert!(matches!(
            err,
            CinebotError::Booking(BookingRejection::ShowtimeNotFound)
        ));
    }

    #[tokio::test]
    async fn malformed_seat_lists_are_rejected() {
        let db = Database::open_in_memory().await.unwrap();
        let st = showtime(&db, 10).await;
        for seats in [&[][..], &["  "][..], &["B1", "B1 "][..]] {
            let err = create_booking(&db, request(1, st, seats)).await.unwrap_err();
            assert!(
                matches!(err, CinebotError::Booking(BookingRejection::InvalidRequest(_))),
                "{seats:?}: {err:?}"
            );
        }
        assert!(occupied_seats(&db, st).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_attempts_on_one_seat_yield_exactly_one_booking() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("race.db"), 5000).await.unwrap();
        let st = showtime(&db, 100).await;

        let attempts: Vec<_> = (0..16)
            .map(|user| {
                let db = db.clone();
                tokio::spawn(async move {
                    create_booking(&db, request(user, st, &["F5", "F6"])).await
                })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => successes += 1,
                Err(CinebotError::Booking(BookingRejection::Conflict { seats })) => {
                    assert_eq!(seats, vec!["F5", "F6"]);
                    conflicts += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);
        assert_eq!(available_seats(&db, st).await.unwrap(), Some(98));
        assert_eq!(occupied_seats(&db, st).await.unwrap(), vec!["F5", "F6"]);
    }

    #[tokio::test]
    async fn separate_connections_cannot_double_book() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("two-conns.db");
        let first = Database::open(&path, 5000).await.unwrap();
        let st = showtime(&first, 100).await;
        let second = Database::open(&path, 5000).await.unwrap();

        let (a, b) = tokio::join!(
            create_booking(&first, request(1, st, &["C3"])),
            create_booking(&second, request(2, st, &["C3"])),
        );
        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(occupied_seats(&first, st).await.unwrap(), vec!["C3"]);
    }
}
