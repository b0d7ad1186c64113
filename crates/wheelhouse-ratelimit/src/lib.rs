// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sliding-window rate limiting for the Wheelhouse coordination engine.
//!
//! Windows are derived from the audit ledger: each check counts the actor's
//! audited actions of the bucket's kind inside a rolling window and compares
//! against the bucket cap. Advisory by construction — reads are not locked
//! against concurrent appends, so a small overshoot under race is accepted.
//! This exists to blunt abuse, not to provide hard guarantees.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use wheelhouse_audit::AuditLedger;
use wheelhouse_config::RateLimitConfig;
use wheelhouse_core::types::ActionKind;
use wheelhouse_core::WheelhouseError;

/// Rate-limited action buckets. Each maps to one audited action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateBucket {
    CreateRequest,
    SendMessage,
    UploadAttachment,
}

impl RateBucket {
    /// The audited action kind whose entries populate this bucket's window.
    pub fn action(self) -> ActionKind {
        match self {
            RateBucket::CreateRequest => ActionKind::CreateRequest,
            RateBucket::SendMessage => ActionKind::SendMessage,
            RateBucket::UploadAttachment => ActionKind::UploadAttachment,
        }
    }
}

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, Copy)]
pub struct RateDecision {
    pub allowed: bool,
    /// How many more actions fit in the current window.
    pub remaining: u32,
    pub limit: u32,
}

/// Sliding-window limiter over the audit ledger.
#[derive(Clone)]
pub struct RateLimiter {
    audit: AuditLedger,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(audit: AuditLedger, config: RateLimitConfig) -> Self {
        Self { audit, config }
    }

    fn limit_for(&self, bucket: RateBucket) -> u32 {
        match bucket {
            RateBucket::CreateRequest => self.config.create_request_max,
            RateBucket::SendMessage => self.config.send_message_max,
            RateBucket::UploadAttachment => self.config.upload_attachment_max,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::seconds(self.config.window_secs as i64)
    }

    /// Check whether `actor_id` may perform another action in `bucket`.
    ///
    /// remaining = max(0, limit - count_since(now - window)).
    pub async fn check(
        &self,
        actor_id: &str,
        bucket: RateBucket,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, WheelhouseError> {
        let limit = self.limit_for(bucket);
        let since = now - self.window();
        let used = self
            .audit
            .count_since(actor_id, bucket.action(), since)
            .await?;
        let remaining = limit.saturating_sub(used);
        let decision = RateDecision {
            allowed: remaining > 0,
            remaining,
            limit,
        };
        if !decision.allowed {
            debug!(actor_id, ?bucket, used, limit, "rate limit reached");
        }
        Ok(decision)
    }

    /// Check, converting a denial into [`WheelhouseError::RateLimited`].
    pub async fn enforce(
        &self,
        actor_id: &str,
        bucket: RateBucket,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, WheelhouseError> {
        let decision = self.check(actor_id, bucket, now).await?;
        if !decision.allowed {
            return Err(WheelhouseError::RateLimited {
                bucket: bucket.action().to_string(),
                limit: decision.limit,
                window_secs: self.config.window_secs,
            });
        }
        Ok(decision)
    }
}
