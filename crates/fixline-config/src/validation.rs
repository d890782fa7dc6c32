// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty paths and positive retry budgets.

use crate::diagnostic::ConfigError;
use crate::model::FixlineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FixlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    } else {
        let addr = config.server.host.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{addr}` is not a valid IP address or hostname"),
            });
        }
    }

    if config.matching.max_attempts == 0 {
        errors.push(ConfigError::Validation {
            message: "matching.max_attempts must be at least 1".to_string(),
        });
    }

    if config.matching.concurrency == 0 {
        errors.push(ConfigError::Validation {
            message: "matching.concurrency must be at least 1".to_string(),
        });
    }

    if config.matching.search_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "matching.search_timeout_secs must be positive".to_string(),
        });
    }

    if config.session.ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.ttl_secs must be positive".to_string(),
        });
    }

    if config.model.history_window < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "model.history_window must be at least 1, got {}",
                config.model.history_window
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
