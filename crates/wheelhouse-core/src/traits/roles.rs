// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Role and identity oracle backed by the external profile store.

use async_trait::async_trait;

use crate::error::WheelhouseError;
use crate::types::{BanStatus, Role};

/// Resolves a caller's role, ban status, and instructor verification status.
///
/// Implementations must answer from live data on every call. Decisions here
/// gate permissions, so cached answers risk acting on a revoked role or an
/// expired ban.
#[async_trait]
pub trait RoleOracle: Send + Sync {
    /// The caller's role, as a closed enum.
    async fn get_role(&self, user_id: &str) -> Result<Role, WheelhouseError>;

    /// Whether the instructor has passed verification. Unverified
    /// instructors cannot claim work.
    async fn is_verified_instructor(&self, user_id: &str) -> Result<bool, WheelhouseError>;

    /// Current ban state, including expiry if the ban is temporary.
    async fn is_banned(&self, user_id: &str) -> Result<BanStatus, WheelhouseError>;
}
