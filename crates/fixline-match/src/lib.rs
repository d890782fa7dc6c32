// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The asynchronous provider-matching pipeline.
//!
//! Clients never wait on a search: `create_booking` enqueues a [`MatchJob`]
//! and replies immediately, and a pool of workers runs the bounded-retry
//! search in the background, reflecting each outcome onto the request via
//! compare-and-set transitions.
//!
//! [`MatchJob`]: fixline_core::types::MatchJob

pub mod pool;
pub mod worker;

pub use pool::MatchPool;
pub use worker::{MatchVerdict, MatchWorker};
