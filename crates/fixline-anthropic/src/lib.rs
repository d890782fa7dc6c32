// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude adapter implementing the `LanguageModel` trait.
//!
//! Single blocking completion calls against the Messages API; no streaming.
//! The tool-call dispatcher treats the model as a black box: prompt + tools
//! in, plain text and/or structured tool invocations out.

pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::AnthropicModel;
pub use client::AnthropicClient;
