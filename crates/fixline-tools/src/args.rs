// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed tool arguments, deserialized from the model's JSON before any
//! executor runs. Unknown fields and missing required fields are rejected
//! here so executors only ever see well-formed input.

use fixline_core::FixlineError;
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListServicesArgs {
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookingArgs {
    pub category_id: i64,
    pub service_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CancelBookingArgs {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondToCandidateArgs {
    pub decision: Decision,
}

/// The client's answer to a found candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Decline,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileArgs {
    pub field: ProfileField,
    pub value: String,
}

/// Fields `update_profile` is allowed to touch. Identity fields collected
/// during onboarding (national id, verification) are deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Name,
    City,
    Address,
    Description,
    HourlyRate,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteBookingArgs {
    pub code: String,
}

/// Parses a tool's arguments, mapping deserialization failures to a
/// recoverable validation error naming the tool.
pub fn parse_args<T: DeserializeOwned>(
    tool: &str,
    arguments: &serde_json::Value,
) -> Result<T, FixlineError> {
    serde_json::from_value(arguments.clone()).map_err(|e| FixlineError::Validation {
        message: format!("invalid arguments for {tool}: {e}"),
    })
}
