//! Configuration resolution for cvdict-ingest
//!
//! The generative API credential comes from one of three tiers:
//! CLI flag → ENV → TOML. Everything else the enrichment client needs is
//! read from the `[enrichment]` TOML section and packed into
//! [`EnrichmentSettings`].

use cvdict_common::config::{EnrichmentConfig, TomlConfig};
use cvdict_common::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the generative API key
pub const API_KEY_ENV: &str = "DEEPSEEK_API_KEY";

/// Resolve the generative API key from the 3-tier configuration
///
/// **Priority:** CLI → ENV → TOML. Blank values are treated as absent.
pub fn resolve_api_key(cli_key: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_key = std::env::var(API_KEY_ENV).ok();
    let toml_key = toml_config.enrichment.api_key.as_deref();

    let tiers = [
        ("command line", cli_key),
        ("environment", env_key.as_deref()),
        ("TOML", toml_key),
    ];

    let sources: Vec<&str> = tiers
        .iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key))
        .map(|(name, _)| *name)
        .collect();

    if sources.len() > 1 {
        warn!(
            "API key found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    let chosen = tiers.into_iter().find(|(_, key)| key.is_some_and(is_valid_key));
    match chosen {
        Some((source, Some(key))) => {
            info!("API key loaded from {}", source);
            Ok(key.trim().to_string())
        }
        _ => Err(Error::Config(format!(
            "Generative API key not configured. Provide one of:\n\
             1. Command line: --api-key <KEY>\n\
             2. Environment: {}=<KEY>\n\
             3. TOML config: [enrichment] api_key = \"<KEY>\"",
            API_KEY_ENV
        ))),
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Fully resolved settings for the enrichment client
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    pub api_url: String,
    pub model: String,
    pub api_key: String,
    /// Minimum delay between two API calls
    pub request_interval: Duration,
    pub timeout: Duration,
    pub temperature: f32,
}

impl EnrichmentSettings {
    pub fn from_config(config: &EnrichmentConfig, api_key: String) -> Self {
        Self {
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
            request_interval: Duration::from_millis(config.request_interval_ms),
            timeout: Duration::from_secs(config.timeout_secs),
            temperature: config.temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn toml_with_key(key: Option<&str>) -> TomlConfig {
        let mut config = TomlConfig::default();
        config.enrichment.api_key = key.map(str::to_string);
        config
    }

    #[test]
    #[serial]
    fn test_cli_key_wins() {
        std::env::set_var(API_KEY_ENV, "env-key");
        let key = resolve_api_key(Some("cli-key"), &toml_with_key(Some("toml-key")));
        std::env::remove_var(API_KEY_ENV);

        assert_eq!(key.unwrap(), "cli-key");
    }

    #[test]
    #[serial]
    fn test_env_beats_toml() {
        std::env::set_var(API_KEY_ENV, "env-key");
        let key = resolve_api_key(None, &toml_with_key(Some("toml-key")));
        std::env::remove_var(API_KEY_ENV);

        assert_eq!(key.unwrap(), "env-key");
    }

    #[test]
    #[serial]
    fn test_blank_values_fall_through() {
        std::env::set_var(API_KEY_ENV, "   ");
        let key = resolve_api_key(Some(""), &toml_with_key(Some("toml-key")));
        std::env::remove_var(API_KEY_ENV);

        assert_eq!(key.unwrap(), "toml-key");
    }

    #[test]
    #[serial]
    fn test_missing_key_is_config_error() {
        std::env::remove_var(API_KEY_ENV);
        let result = resolve_api_key(None, &TomlConfig::default());

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_settings_from_config() {
        let settings =
            EnrichmentSettings::from_config(&EnrichmentConfig::default(), "k".to_string());

        assert_eq!(settings.request_interval, Duration::from_millis(1000));
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.model, "deepseek-chat");
    }
}
