// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Wheelhouse coordination engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Wheelhouse configuration.
///
/// Loaded from TOML with environment variable overrides. All sections are
/// optional and default to the values described on each field.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WheelhouseConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Free-tier chat quota settings.
    #[serde(default)]
    pub quota: QuotaConfig,

    /// Sliding-window rate limit settings.
    #[serde(default)]
    pub ratelimit: RateLimitConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Whether to enable WAL journal mode.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

/// Free-tier chat quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuotaConfig {
    /// Distinct conversations a free-tier instructor may engage per
    /// calendar month.
    #[serde(default = "default_free_conversations")]
    pub free_conversations_per_month: u32,

    /// Usage at or above this count flags the summary as near the limit.
    #[serde(default = "default_near_limit_threshold")]
    pub near_limit_threshold: u32,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_conversations_per_month: default_free_conversations(),
            near_limit_threshold: default_near_limit_threshold(),
        }
    }
}

/// Sliding-window rate limit configuration, per action bucket.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Max request creations per window.
    #[serde(default = "default_create_request_max")]
    pub create_request_max: u32,

    /// Max messages sent per window.
    #[serde(default = "default_send_message_max")]
    pub send_message_max: u32,

    /// Max attachment uploads per window.
    #[serde(default = "default_upload_attachment_max")]
    pub upload_attachment_max: u32,

    /// Rolling window length, in seconds, shared by all buckets.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            create_request_max: default_create_request_max(),
            send_message_max: default_send_message_max(),
            upload_attachment_max: default_upload_attachment_max(),
            window_secs: default_window_secs(),
        }
    }
}

fn default_database_path() -> String {
    "wheelhouse.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

fn default_free_conversations() -> u32 {
    7
}

fn default_near_limit_threshold() -> u32 {
    5
}

fn default_create_request_max() -> u32 {
    5
}

fn default_send_message_max() -> u32 {
    50
}

fn default_upload_attachment_max() -> u32 {
    20
}

fn default_window_secs() -> u64 {
    3600
}
