// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborator adapters for deterministic tests.
//!
//! [`MockMessaging`] records every outbound send; [`MockModel`] replays a
//! scripted sequence of replies. Neither touches the network.

pub mod mock_messaging;
pub mod mock_model;

pub use mock_messaging::{MockMessaging, SentMessage};
pub use mock_model::MockModel;
