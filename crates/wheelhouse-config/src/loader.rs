// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./wheelhouse.toml` > `~/.config/wheelhouse/wheelhouse.toml`
//! > `/etc/wheelhouse/wheelhouse.toml` with environment variable overrides via
//! `WHEELHOUSE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::WheelhouseConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/wheelhouse/wheelhouse.toml` (system-wide)
/// 3. `~/.config/wheelhouse/wheelhouse.toml` (user XDG config)
/// 4. `./wheelhouse.toml` (local directory)
/// 5. `WHEELHOUSE_*` environment variables
pub fn load_config() -> Result<WheelhouseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WheelhouseConfig::default()))
        .merge(Toml::file("/etc/wheelhouse/wheelhouse.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("wheelhouse/wheelhouse.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("wheelhouse.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<WheelhouseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WheelhouseConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WheelhouseConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WheelhouseConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `WHEELHOUSE_STORAGE_DATABASE_PATH` must
/// map to `storage.database_path`, not `storage.database.path`.
fn env_provider() -> Env {
    Env::prefixed("WHEELHOUSE_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: WHEELHOUSE_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("quota_", "quota.", 1)
            .replacen("ratelimit_", "ratelimit.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.quota.free_conversations_per_month, 7);
        assert_eq!(config.storage.database_path, "wheelhouse.db");
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [storage]
            database_path = "/var/lib/wheelhouse/engine.db"

            [quota]
            free_conversations_per_month = 10

            [ratelimit]
            send_message_max = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.database_path, "/var/lib/wheelhouse/engine.db");
        assert_eq!(config.quota.free_conversations_per_month, 10);
        assert_eq!(config.ratelimit.send_message_max, 100);
        // Untouched keys keep defaults.
        assert_eq!(config.ratelimit.create_request_max, 5);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [quota]
            free_conversations = 3
            "#,
        );
        assert!(result.is_err(), "unknown key should be rejected");
    }

    #[test]
    fn env_vars_override_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "wheelhouse.toml",
                r#"
                [quota]
                free_conversations_per_month = 3
                "#,
            )?;
            jail.set_env("WHEELHOUSE_QUOTA_FREE_CONVERSATIONS_PER_MONTH", "12");

            let config: WheelhouseConfig = Figment::new()
                .merge(Serialized::defaults(WheelhouseConfig::default()))
                .merge(Toml::file("wheelhouse.toml"))
                .merge(env_provider())
                .extract()?;
            assert_eq!(config.quota.free_conversations_per_month, 12);
            Ok(())
        });
    }
}
