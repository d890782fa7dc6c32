// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool catalog, argument validation, and the tool-call dispatcher that
//! serves the two main-menu conversation steps.
//!
//! The dispatcher owns no conversation state of its own: it reads the bounded
//! history window from the entity gateway, lets the language model decide
//! which tools to invoke, executes each invocation in isolation, and hands
//! back one assembled reply.

pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod executor;

pub use catalog::tool_catalog;
pub use dispatcher::{GENERIC_RETRY, ToolDispatcher};
pub use executor::{ToolExecutor, ToolOutcome};
