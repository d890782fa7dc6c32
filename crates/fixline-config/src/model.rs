// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Fixline service-matching agent.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Fixline configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FixlineConfig {
    /// Agent identity and behavior settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// WhatsApp Cloud API transport settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Webhook server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Language model service settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Ephemeral session store settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Matching pipeline settings.
    #[serde(default)]
    pub matching: MatchingConfig,
}

/// Agent identity and behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system prompt override for the tool-call dispatcher.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
            system_prompt: None,
        }
    }
}

fn default_agent_name() -> String {
    "fixline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// WhatsApp Cloud API transport configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Cloud API access token. `None` disables the outbound sender.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Business phone number id used in the send endpoint path.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Token expected in the GET webhook verification handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret used to verify `X-Hub-Signature-256` on inbound payloads.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Base URL override for the Cloud API (for testing).
    #[serde(default)]
    pub api_base: Option<String>,
}

/// Webhook server bind configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Language model service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// API key. `None` requires an environment variable at the adapter.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model identifier for completion requests.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Number of conversation turns kept in the bounded model window.
    #[serde(default = "default_history_window")]
    pub history_window: i64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            history_window: default_history_window(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_history_window() -> i64 {
    10
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "fixline.db".to_string()
}

/// Ephemeral session store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Session TTL in seconds. After expiry, recovery runs again.
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
        }
    }
}

fn default_session_ttl_secs() -> u64 {
    86_400
}

/// Matching pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    /// Search attempts per cycle before `NoProviderFound`.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay between empty-search retries, in seconds.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,

    /// Global timeout from request creation to `Expired`, in seconds.
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,

    /// Number of concurrent pipeline workers.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Worker queue poll interval, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_interval_secs: default_retry_interval_secs(),
            search_timeout_secs: default_search_timeout_secs(),
            concurrency: default_concurrency(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_interval_secs() -> u64 {
    60
}

fn default_search_timeout_secs() -> u64 {
    3_600
}

fn default_concurrency() -> usize {
    4
}

fn default_poll_interval_secs() -> u64 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = FixlineConfig::default();
        assert_eq!(config.agent.name, "fixline");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.model.history_window, 10);
        assert_eq!(config.session.ttl_secs, 86_400);
        assert_eq!(config.matching.max_attempts, 3);
        assert_eq!(config.matching.concurrency, 4);
    }

    #[test]
    fn toml_sections_deserialize() {
        let toml_str = r#"
[agent]
name = "fixline-test"

[matching]
max_attempts = 5
retry_interval_secs = 10

[whatsapp]
verify_token = "secret"
"#;
        let config: FixlineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.name, "fixline-test");
        assert_eq!(config.matching.max_attempts, 5);
        assert_eq!(config.matching.retry_interval_secs, 10);
        assert_eq!(config.whatsapp.verify_token.as_deref(), Some("secret"));
        // Unset sections fall back to defaults.
        assert_eq!(config.storage.database_path, "fixline.db");
    }

    #[test]
    fn unknown_field_is_rejected() {
        let toml_str = r#"
[session]
ttl_seconds = 60
"#;
        assert!(toml::from_str::<FixlineConfig>(toml_str).is_err());
    }
}
