// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Campaigner dispatch engine.
//!
//! WAL-mode SQLite with embedded migrations and a single-writer model via
//! `tokio-rusqlite`. [`SqliteStore`] implements every collaborator trait the
//! dispatcher needs; the [`queries`] modules also carry the operator CRUD for
//! tags, email/mobile/notification subscribers, templates, services, and
//! campaigns.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;

pub use adapter::SqliteStore;
pub use database::Database;
pub use models::*;
