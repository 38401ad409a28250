// SPDX-FileCopyrightText: 2026 Cinebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./cinebot.toml` > `~/.config/cinebot/cinebot.toml` > `/etc/cinebot/cinebot.toml`
//! with environment variable overrides via `CINEBOT_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CinebotConfig;

/// Top-level sections, used to split `CINEBOT_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &[
    "agent",
    "provider",
    "storage",
    "session",
    "recommendation",
    "gateway",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/cinebot/cinebot.toml` (system-wide)
/// 3. `~/.config/cinebot/cinebot.toml` (user XDG config)
/// 4. `./cinebot.toml` (local directory)
/// 5. `CINEBOT_*` environment variables
pub fn load_config() -> Result<CinebotConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<CinebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CinebotConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CinebotConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CinebotConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CinebotConfig::default()))
        .merge(Toml::file("/etc/cinebot/cinebot.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("cinebot/cinebot.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("cinebot.toml"))
        .merge(env_provider())
}

/// Environment provider with explicit section-to-dot mapping.
///
/// `Env::split("_")` would turn `CINEBOT_PROVIDER_API_KEY` into
/// `provider.api.key`; only the first underscore after a known section
/// name becomes a dot.
fn env_provider() -> Env {
    Env::prefixed("CINEBOT_").map(|key| map_env_key(key.as_str()).into())
}

/// Maps a prefix-stripped env var name, in any case, to a lowercase dotted
/// config path.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_splits_only_after_section() {
        assert_eq!(map_env_key("provider_api_key"), "provider.api_key");
        assert_eq!(map_env_key("gateway_jwt_secret"), "gateway.jwt_secret");
        assert_eq!(
            map_env_key("session_inactivity_hours"),
            "session.inactivity_hours"
        );
    }

    #[test]
    fn env_key_case_is_folded() {
        assert_eq!(map_env_key("PROVIDER_API_KEY"), "provider.api_key");
        assert_eq!(map_env_key("GATEWAY_PORT"), "gateway.port");
    }

    #[test]
    fn unknown_prefix_is_left_alone() {
        assert_eq!(map_env_key("unrelated_key"), "unrelated_key");
    }
}
