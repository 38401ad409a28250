// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local user rows.
//!
//! Identities are issued by an external auth service; a row is created the
//! first time a signed-in caller writes anything so foreign keys hold.

use cinebot_core::Identity;
use rusqlite::params;

/// Insert the user if absent. Runs inside the caller's transaction.
pub(crate) fn ensure_user(conn: &rusqlite::Connection, user: &Identity) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (user_id, username, email) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO NOTHING",
        params![user.user_id, user.name, user.email],
    )?;
    Ok(())
}
