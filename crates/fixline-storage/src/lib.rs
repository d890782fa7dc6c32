// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed durable storage for Fixline.
//!
//! Provides the [`SqliteEntities`] adapter, which implements both the
//! `EntityGateway` trait (users, provider profiles, service requests,
//! conversation turns, payments) and the `JobQueue` trait (the durable
//! at-least-once queue driving the provider-matching pipeline).
//!
//! All access goes through a single serialized writer connection in WAL
//! mode, so concurrent tasks never see `SQLITE_BUSY`.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteEntities;
pub use database::Database;
