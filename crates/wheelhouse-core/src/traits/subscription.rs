// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subscription store for instructor paid plans.

use async_trait::async_trait;

use crate::error::WheelhouseError;
use crate::types::Subscription;

/// Read-only view of instructor subscriptions.
///
/// An active, unexpired subscription exempts the instructor from the
/// free-tier conversation quota. Looked up live on every quota decision.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// The instructor's current subscription, if any.
    async fn get_active_subscription(
        &self,
        instructor_id: &str,
    ) -> Result<Option<Subscription>, WheelhouseError>;
}
