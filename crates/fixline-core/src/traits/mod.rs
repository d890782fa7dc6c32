// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits for the Fixline core.
//!
//! The conversation engine and matching pipeline receive these four
//! collaborator interfaces (plus the job queue) by explicit dependency
//! injection, enabling deterministic testing without network calls.

pub mod adapter;
pub mod entities;
pub mod messaging;
pub mod model;
pub mod queue;
pub mod session;

pub use adapter::PluginAdapter;
pub use entities::EntityGateway;
pub use messaging::MessagingGateway;
pub use model::LanguageModel;
pub use queue::JobQueue;
pub use session::SessionStore;
