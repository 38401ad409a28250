// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::CinebotConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every failure instead of stopping at the first one.
pub fn validate_config(config: &CinebotConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if config.session.history_limit < 2 {
        fail(format!(
            "session.history_limit must be at least 2, got {}",
            config.session.history_limit
        ));
    }

    if config.session.inactivity_hours == 0 {
        fail("session.inactivity_hours must be greater than 0".to_string());
    }

    if !(-12..=14).contains(&config.session.timezone_offset_hours) {
        fail(format!(
            "session.timezone_offset_hours must be between -12 and 14, got {}",
            config.session.timezone_offset_hours
        ));
    }

    if config.gateway.host.trim().is_empty() {
        fail("gateway.host must not be empty".to_string());
    }

    for (key, url) in [
        ("provider.base_url", &config.provider.base_url),
        ("recommendation.base_url", &config.recommendation.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("{key} `{url}` must be an http:// or https:// URL"));
        }
    }

    if config.provider.model.trim().is_empty() {
        fail("provider.model must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &CinebotConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&CinebotConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CinebotConfig::default();
        config.storage.database_path = "  ".to_string();
        assert!(messages(&config)[0].contains("database_path"));
    }

    #[test]
    fn all_failures_are_collected() {
        let mut config = CinebotConfig::default();
        config.session.history_limit = 1;
        config.session.timezone_offset_hours = 20;
        config.recommendation.base_url = "localhost:8000".to_string();
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 3, "{msgs:?}");
        assert!(msgs.iter().any(|m| m.contains("history_limit")));
        assert!(msgs.iter().any(|m| m.contains("timezone_offset_hours")));
        assert!(msgs.iter().any(|m| m.contains("recommendation.base_url")));
    }
}
