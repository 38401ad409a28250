// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules, one per storage concern.

pub mod bookings;
pub mod catalog;
pub mod conversations;
pub mod messages;
pub mod users;
