// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog reads for the query tools, plus inserts used to load the catalog.
//!
//! Text matching is case-insensitive substring matching through the
//! `casefold` SQL function registered by [`Database::open`].

use cinebot_core::CinebotError;
use rusqlite::{OptionalExtension, params, params_from_iter};

use crate::database::{Database, map_tr_err};
use crate::models::{
    CatalogSnapshot, MovieAtCinemaRow, MovieDetails, NewMovie, NewShowtime, PolicyRow, ShowtimeRow,
    normalize_start_time,
};

/// Filter for [`showtimes_for_movie`]. Instants use the `start_time` format.
#[derive(Debug, Clone)]
pub struct ShowtimeFilter {
    pub title: String,
    pub city: Option<String>,
    pub cinema: Option<String>,
    /// Inclusive lower bound of the day window.
    pub from: String,
    /// Exclusive upper bound of the day window.
    pub until: String,
    /// Only showtimes strictly after this instant are returned.
    pub after: String,
}

fn showtime_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ShowtimeRow> {
    Ok(ShowtimeRow {
        showtime_id: row.get(0)?,
        start_time: row.get(1)?,
        ticket_price: row.get(2)?,
        cinema_name: row.get(3)?,
        city: row.get(4)?,
        movie_id: row.get(5)?,
        title: row.get(6)?,
        features: row.get(7)?,
    })
}

/// Future showtimes of a movie within one day window, ordered by cinema
/// name then start time.
pub async fn showtimes_for_movie(
    db: &Database,
    filter: ShowtimeFilter,
) -> Result<Vec<ShowtimeRow>, CinebotError> {
    db.connection()
        .call(move |conn| -> Result<Vec<ShowtimeRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT s.showtime_id, s.start_time, s.ticket_price, c.name, c.city,
                        m.movie_id, m.title, m.features
                 FROM showtimes s
                 JOIN movies m ON m.movie_id = s.movie_id
                 JOIN cinemas c ON c.cinema_id = s.cinema_id
                 WHERE instr(casefold(m.title), casefold(?1)) > 0
                   AND s.start_time >= ?2 AND s.start_time < ?3
                   AND s.start_time > ?4
                   AND (?5 IS NULL OR instr(casefold(c.city), casefold(?5)) > 0)
                   AND (?6 IS NULL OR instr(casefold(c.name), casefold(?6)) > 0)
                 ORDER BY c.name, s.start_time",
            )?;
            let rows = stmt.query_map(
                params![
                    filter.title,
                    filter.from,
                    filter.until,
                    filter.after,
                    filter.city,
                    filter.cinema
                ],
                showtime_from_row,
            )?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Distinct movies with future showtimes at a cinema within one day window.
pub async fn movies_at_cinema(
    db: &Database,
    cinema: &str,
    from: &str,
    until: &str,
    after: &str,
) -> Result<Vec<MovieAtCinemaRow>, CinebotError> {
    let (cinema, from, until, after) = (
        cinema.to_string(),
        from.to_string(),
        until.to_string(),
        after.to_string(),
    );
    db.connection()
        .call(move |conn| -> Result<Vec<MovieAtCinemaRow>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT m.title, m.genre, COUNT(s.showtime_id)
                 FROM showtimes s
                 JOIN movies m ON m.movie_id = s.movie_id
                 JOIN cinemas c ON c.cinema_id = s.cinema_id
                 WHERE instr(casefold(c.name), casefold(?1)) > 0
                   AND s.start_time >= ?2 AND s.start_time < ?3
                   AND s.start_time > ?4
                 GROUP BY m.movie_id, m.title, m.genre
                 ORDER BY m.title",
            )?;
            let rows = stmt.query_map(params![cinema, from, until, after], |row| {
                Ok(MovieAtCinemaRow {
                    title: row.get(0)?,
                    genre: row.get(1)?,
                    showtime_count: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Best match for a title: an exact (case-insensitive) title wins,
/// otherwise the shortest title containing the query.
pub async fn movie_details(
    db: &Database,
    title: &str,
) -> Result<Option<MovieDetails>, CinebotError> {
    let title = title.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MovieDetails>, rusqlite::Error> {
            conn.query_row(
                "SELECT movie_id, title, description, genre, rating, director, cast_members,
                        duration_minutes, release_date, features
                 FROM movies
                 WHERE instr(casefold(title), casefold(?1)) > 0
                 ORDER BY casefold(title) = casefold(?1) DESC, length(title), movie_id
                 LIMIT 1",
                params![title],
                |row| {
                    Ok(MovieDetails {
                        movie_id: row.get(0)?,
                        title: row.get(1)?,
                        description: row.get(2)?,
                        genre: row.get(3)?,
                        rating: row.get(4)?,
                        director: row.get(5)?,
                        cast_members: row.get(6)?,
                        duration_minutes: row.get(7)?,
                        release_date: row.get(8)?,
                        features: row.get(9)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Policies whose title or content contains every word, at most `limit` rows.
pub async fn search_policies(
    db: &Database,
    words: Vec<String>,
    limit: u32,
) -> Result<Vec<PolicyRow>, CinebotError> {
    if words.is_empty() {
        return Ok(Vec::new());
    }
    db.connection()
        .call(move |conn| -> Result<Vec<PolicyRow>, rusqlite::Error> {
            let clauses: Vec<String> = (1..=words.len())
                .map(|i| format!("instr(casefold(title || ' ' || content), casefold(?{i})) > 0"))
                .collect();
            let sql = format!(
                "SELECT policy_id, category, title, content FROM policies
                 WHERE {} ORDER BY category, policy_id LIMIT {limit}",
                clauses.join(" AND ")
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(words.iter()), |row| {
                Ok(PolicyRow {
                    policy_id: row.get(0)?,
                    category: row.get(1)?,
                    title: row.get(2)?,
                    content: row.get(3)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Titles released on or before `today` (`YYYY-MM-DD`), distinct cities, and
/// cinema names.
pub async fn catalog_snapshot(db: &Database, today: &str) -> Result<CatalogSnapshot, CinebotError> {
    let today = today.to_string();
    db.connection()
        .call(move |conn| -> Result<CatalogSnapshot, rusqlite::Error> {
            Ok(CatalogSnapshot {
                now_showing: text_column(
                    conn,
                    "SELECT title FROM movies
                     WHERE release_date IS NOT NULL AND release_date <= ?1
                     ORDER BY release_date DESC, title",
                    params![today],
                )?,
                cities: text_column(conn, "SELECT DISTINCT city FROM cinemas ORDER BY city", [])?,
                cinemas: text_column(conn, "SELECT name FROM cinemas ORDER BY name", [])?,
            })
        })
        .await
        .map_err(map_tr_err)
}

fn text_column(
    conn: &rusqlite::Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, |row| row.get(0))?;
    rows.collect()
}

pub async fn insert_movie(db: &Database, movie: NewMovie) -> Result<i64, CinebotError> {
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO movies (title, description, genre, rating, director, cast_members,
                                     duration_minutes, release_date, features)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    movie.title,
                    movie.description,
                    movie.genre,
                    movie.rating,
                    movie.director,
                    movie.cast_members,
                    movie.duration_minutes,
                    movie.release_date,
                    movie.features,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_cinema(
    db: &Database,
    name: &str,
    city: &str,
    address: Option<&str>,
) -> Result<i64, CinebotError> {
    let (name, city, address) = (name.to_string(), city.to_string(), address.map(str::to_string));
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO cinemas (name, city, address) VALUES (?1, ?2, ?3)",
                params![name, city, address],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a showtime. `start_time` is stored in UTC `START_TIME_FORMAT`
/// whatever offset it was given in; anything unparseable is rejected.
pub async fn insert_showtime(db: &Database, mut showtime: NewShowtime) -> Result<i64, CinebotError> {
    showtime.start_time =
        normalize_start_time(&showtime.start_time).ok_or_else(|| CinebotError::Storage {
            source: format!("invalid showtime start_time `{}`", showtime.start_time).into(),
        })?;
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO showtimes (movie_id, cinema_id, start_time, ticket_price, available_seats)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    showtime.movie_id,
                    showtime.cinema_id,
                    showtime.start_time,
                    showtime.ticket_price,
                    showtime.available_seats,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

pub async fn insert_policy(
    db: &Database,
    category: &str,
    title: &str,
    content: &str,
) -> Result<i64, CinebotError> {
    let (category, title, content) = (category.to_string(), title.to_string(), content.to_string());
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.execute(
                "INSERT INTO policies (category, title, content) VALUES (?1, ?2, ?3)",
                params![category, title, content],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}
