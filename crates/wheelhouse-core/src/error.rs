// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Wheelhouse coordination engine.

use thiserror::Error;

use crate::types::RequestStatus;

/// The primary error type used across all Wheelhouse components.
///
/// The first six variants form the caller-facing taxonomy and are translated
/// to user-visible responses by the (external) HTTP layer. The remaining
/// variants cover configuration, storage, and internal failures.
#[derive(Debug, Error)]
pub enum WheelhouseError {
    /// The referenced request or conversation does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The target status is not reachable from the current status.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },

    /// Role, ownership, or verification check failed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Lost race on a conditional update; caller should re-read and retry.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Free-tier monthly conversation allowance is exhausted.
    /// Raised by the quota check only, never by a charge.
    #[error("monthly conversation quota exhausted ({used}/{limit})")]
    QuotaExceeded { used: u32, limit: u32 },

    /// Sliding-window rate limit reached for the given action bucket.
    #[error("rate limited: {bucket} ({limit} per {window_secs}s)")]
    RateLimited {
        bucket: String,
        limit: u32,
        window_secs: u64,
    },

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WheelhouseError {
    /// Wrap an arbitrary error as a storage failure.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(source),
        }
    }
}
