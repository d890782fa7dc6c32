// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Input validation for the scripted onboarding steps.
//!
//! Every function returns a recoverable validation error with a corrective,
//! user-facing message; the engine replies with it and stays on the same step.

use std::sync::LazyLock;

use regex::Regex;

use fixline_core::FixlineError;

/// National id format: two digits, seven digits, one check letter, two digits.
static NATIONAL_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{2}-\d{7}-[A-Za-z]-\d{2}$").unwrap_or_else(|e| panic!("static regex: {e}"))
});

/// Validates and normalizes a full name.
pub fn name(input: &str) -> Result<String, FixlineError> {
    let trimmed = input.trim();
    if trimmed.len() < 2 || trimmed.len() > 100 {
        return Err(FixlineError::validation(
            "Please send your full name (2 to 100 characters).",
        ));
    }
    Ok(trimmed.to_string())
}

/// Validates a national id and uppercases the check letter.
pub fn national_id(input: &str) -> Result<String, FixlineError> {
    let trimmed = input.trim();
    if !NATIONAL_ID_RE.is_match(trimmed) {
        return Err(FixlineError::validation(
            "That ID number doesn't look right. Please use the format \
             00-0000000-X-00, for example 63-1234567-A-42.",
        ));
    }
    Ok(trimmed.to_uppercase())
}

/// Validates a free-text field like city or street address.
pub fn place(input: &str, what: &str) -> Result<String, FixlineError> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.len() > 200 {
        return Err(FixlineError::Validation {
            message: format!("Please send your {what} as a short line of text."),
        });
    }
    Ok(trimmed.to_string())
}

/// Parses "latitude, longitude" coordinates and range-checks them.
pub fn coordinates(input: &str) -> Result<(f64, f64), FixlineError> {
    let corrective = "Please share your location as latitude, longitude — for \
                      example -17.8252, 31.0335.";
    let mut parts = input.trim().splitn(2, ',');
    let lat: f64 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| FixlineError::validation(corrective))?;
    let lon: f64 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| FixlineError::validation(corrective))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(FixlineError::validation(corrective));
    }
    Ok((lat, lon))
}

/// Parses a numeric menu selection and checks it against the offered ids.
pub fn selection(input: &str, offered: &[i64], what: &str) -> Result<i64, FixlineError> {
    let choice: i64 = input.trim().parse().map_err(|_| FixlineError::Validation {
        message: format!("Please reply with the number of a {what} from the list."),
    })?;
    if !offered.contains(&choice) {
        return Err(FixlineError::Validation {
            message: format!("{choice} is not one of the listed {what} options."),
        });
    }
    Ok(choice)
}

/// Validates a service description.
pub fn description(input: &str) -> Result<String, FixlineError> {
    let trimmed = input.trim();
    if trimmed.len() < 10 || trimmed.len() > 500 {
        return Err(FixlineError::validation(
            "Please describe your service in a sentence or two (at least 10 characters).",
        ));
    }
    Ok(trimmed.to_string())
}

/// Parses a positive hourly rate.
pub fn hourly_rate(input: &str) -> Result<f64, FixlineError> {
    let rate: f64 = input
        .trim()
        .trim_start_matches('$')
        .parse()
        .map_err(|_| FixlineError::validation("Please send your hourly rate as a number, e.g. 25 or 17.50."))?;
    if rate <= 0.0 || !rate.is_finite() {
        return Err(FixlineError::validation("Your hourly rate must be a positive number."));
    }
    Ok(rate)
}
