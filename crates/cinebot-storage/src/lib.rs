// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Cinebot.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! background connection via `tokio-rusqlite`, typed read queries over the
//! movie catalog, the conversation log, and the seat booking transaction.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::Database;
pub use models::*;
