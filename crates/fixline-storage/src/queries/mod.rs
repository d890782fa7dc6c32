// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per entity family.

pub mod catalog;
pub mod payments;
pub mod providers;
pub mod queue;
pub mod requests;
pub mod turns;
pub mod users;

/// Parse a TEXT column into a strum enum, reporting failures as column
/// conversion errors so they surface with the offending index.
pub(crate) fn parse_enum<T>(idx: usize, value: &str) -> Result<T, rusqlite::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
