// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The chat usage meter.
//!
//! Free-tier instructors may engage a limited number of distinct
//! conversations per calendar month; instructors with a live subscription
//! are unmetered. "Engage" means the instructor's first message into a
//! conversation — a conversation is charged at most once, ever, against the
//! period in which it was first engaged, so a dormant conversation resuming
//! months later never costs a second slot.
//!
//! The check/charge pair is deliberately not one atomic operation. `charge`
//! runs only after a message was actually persisted, and tolerates a
//! concurrent charge having consumed the last slot in the meantime: the
//! metering is advisory, not a hard reservation.

use std::sync::Arc;

use chrono::{DateTime, Datelike, TimeZone, Utc};
use tracing::{debug, info};

use wheelhouse_config::QuotaConfig;
use wheelhouse_core::types::{format_ts, ConversationUsageLog};
use wheelhouse_core::{SubscriptionStore, WheelhouseError};
use wheelhouse_storage::{queries, Database};

/// Outcome of a quota check.
#[derive(Debug, Clone, Copy)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Conversations charged this calendar month. Zero for plan holders.
    pub used: u32,
    /// None means unmetered (active plan).
    pub limit: Option<u32>,
    /// True when an allowed send would charge a fresh conversation.
    pub is_first_charge: bool,
    pub has_active_plan: bool,
}

/// Informational usage snapshot for an instructor.
#[derive(Debug, Clone, Copy)]
pub struct UsageSummary {
    pub has_active_plan: bool,
    pub used: u32,
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// First instant of the next calendar month.
    pub renews_at: DateTime<Utc>,
    pub near_limit: bool,
}

/// Per-instructor monthly conversation meter.
#[derive(Clone)]
pub struct ChatQuota {
    db: Database,
    subscriptions: Arc<dyn SubscriptionStore>,
    config: QuotaConfig,
}

impl ChatQuota {
    pub fn new(db: Database, subscriptions: Arc<dyn SubscriptionStore>, config: QuotaConfig) -> Self {
        Self {
            db,
            subscriptions,
            config,
        }
    }

    /// Live plan lookup; never cached across calls.
    async fn has_live_plan(
        &self,
        instructor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, WheelhouseError> {
        Ok(self
            .subscriptions
            .get_active_subscription(instructor_id)
            .await?
            .is_some_and(|sub| sub.is_live(now)))
    }

    /// May this instructor send into this conversation right now?
    pub async fn can_send(
        &self,
        instructor_id: &str,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, WheelhouseError> {
        if self.has_live_plan(instructor_id, now).await? {
            return Ok(QuotaDecision {
                allowed: true,
                used: 0,
                limit: None,
                is_first_charge: false,
                has_active_plan: true,
            });
        }

        let limit = self.config.free_conversations_per_month;
        let usage = queries::quota::ensure_month_row(
            &self.db,
            instructor_id,
            now.year(),
            now.month(),
            &uuid::Uuid::new_v4().to_string(),
        )
        .await?;

        // Lifetime check: an already-charged conversation stays open forever.
        if queries::quota::is_conversation_charged(&self.db, instructor_id, conversation_id).await? {
            return Ok(QuotaDecision {
                allowed: true,
                used: usage.used_conversations,
                limit: Some(limit),
                is_first_charge: false,
                has_active_plan: false,
            });
        }

        let allowed = usage.used_conversations < limit;
        debug!(
            instructor_id,
            conversation_id,
            used = usage.used_conversations,
            limit,
            allowed,
            "quota check for fresh conversation"
        );
        Ok(QuotaDecision {
            allowed,
            used: usage.used_conversations,
            limit: Some(limit),
            is_first_charge: allowed,
            has_active_plan: false,
        })
    }

    /// Like [`can_send`], but converts a denial into
    /// [`WheelhouseError::QuotaExceeded`].
    ///
    /// [`can_send`]: ChatQuota::can_send
    pub async fn enforce(
        &self,
        instructor_id: &str,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, WheelhouseError> {
        let decision = self.can_send(instructor_id, conversation_id, now).await?;
        if !decision.allowed {
            return Err(WheelhouseError::QuotaExceeded {
                used: decision.used,
                limit: decision.limit.unwrap_or_default(),
            });
        }
        Ok(decision)
    }

    /// Permanently consume one quota slot for this conversation.
    ///
    /// Idempotent: repeat calls for an already-charged conversation change
    /// nothing. Called only after a message was actually persisted. Never
    /// fails on an exhausted meter — overage from a lost check/charge race
    /// is accepted.
    pub async fn charge(
        &self,
        instructor_id: &str,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, WheelhouseError> {
        let log = ConversationUsageLog {
            id: uuid::Uuid::new_v4().to_string(),
            instructor_id: instructor_id.to_string(),
            conversation_id: conversation_id.to_string(),
            year: now.year(),
            month: now.month(),
            created_at: format_ts(now),
        };
        let charged = queries::quota::charge_conversation(
            &self.db,
            log,
            &uuid::Uuid::new_v4().to_string(),
        )
        .await?;
        if charged {
            info!(instructor_id, conversation_id, "conversation charged against quota");
        }
        Ok(charged)
    }

    /// Usage snapshot for display.
    pub async fn usage_summary(
        &self,
        instructor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageSummary, WheelhouseError> {
        let renews_at = next_month_start(now)?;
        if self.has_live_plan(instructor_id, now).await? {
            return Ok(UsageSummary {
                has_active_plan: true,
                used: 0,
                limit: None,
                remaining: None,
                renews_at,
                near_limit: false,
            });
        }

        let used = queries::quota::month_usage(&self.db, instructor_id, now.year(), now.month())
            .await?
            .map(|row| row.used_conversations)
            .unwrap_or(0);
        let limit = self.config.free_conversations_per_month;
        Ok(UsageSummary {
            has_active_plan: false,
            used,
            limit: Some(limit),
            remaining: Some(limit.saturating_sub(used)),
            renews_at,
            near_limit: used >= self.config.near_limit_threshold,
        })
    }
}

/// First instant of the calendar month after `now`.
pub fn next_month_start(now: DateTime<Utc>) -> Result<DateTime<Utc>, WheelhouseError> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| WheelhouseError::Internal(format!("invalid month boundary {year}-{month}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use wheelhouse_core::types::Subscription;

    struct FixedSubscriptions {
        plans: HashMap<String, Subscription>,
    }

    #[async_trait]
    impl SubscriptionStore for FixedSubscriptions {
        async fn get_active_subscription(
            &self,
            instructor_id: &str,
        ) -> Result<Option<Subscription>, WheelhouseError> {
            Ok(self.plans.get(instructor_id).cloned())
        }
    }

    async fn meter_with_plans(plans: HashMap<String, Subscription>) -> ChatQuota {
        let db = Database::open_in_memory().await.unwrap();
        ChatQuota::new(db, Arc::new(FixedSubscriptions { plans }), QuotaConfig::default())
    }

    async fn free_tier_meter() -> ChatQuota {
        meter_with_plans(HashMap::new()).await
    }

    fn march() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn fresh_conversation_is_first_charge() {
        let meter = free_tier_meter().await;
        let decision = meter.can_send("ins-1", "conv-1", march()).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.is_first_charge);
        assert_eq!(decision.used, 0);
        assert_eq!(decision.limit, Some(7));
        assert!(!decision.has_active_plan);
    }

    #[tokio::test]
    async fn seventh_conversation_allowed_eighth_denied() {
        let meter = free_tier_meter().await;
        let now = march();
        for i in 0..6 {
            meter.charge("ins-1", &format!("conv-{i}"), now).await.unwrap();
        }

        // used=6: a brand-new conversation is still allowed and would charge.
        let decision = meter.can_send("ins-1", "conv-6", now).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.is_first_charge);
        assert_eq!(decision.used, 6);

        meter.charge("ins-1", "conv-6", now).await.unwrap();

        // used=7: the next fresh conversation is denied.
        let decision = meter.can_send("ins-1", "conv-7", now).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.used, 7);

        let err = meter.enforce("ins-1", "conv-7", now).await.unwrap_err();
        assert!(matches!(err, WheelhouseError::QuotaExceeded { used: 7, limit: 7 }));

        // But the already-charged conversations stay open.
        let decision = meter.can_send("ins-1", "conv-3", now).await.unwrap();
        assert!(decision.allowed);
        assert!(!decision.is_first_charge);
    }

    #[tokio::test]
    async fn charge_is_idempotent() {
        let meter = free_tier_meter().await;
        let now = march();
        assert!(meter.charge("ins-1", "conv-1", now).await.unwrap());
        assert!(!meter.charge("ins-1", "conv-1", now).await.unwrap());
        assert!(!meter.charge("ins-1", "conv-1", now + Duration::days(40)).await.unwrap());

        let summary = meter.usage_summary("ins-1", now).await.unwrap();
        assert_eq!(summary.used, 1);
    }

    #[tokio::test]
    async fn charged_conversation_stays_free_across_months() {
        let meter = free_tier_meter().await;
        let now = march();
        meter.charge("ins-1", "conv-1", now).await.unwrap();

        // Next month: continuing the same conversation is allowed and does
        // not touch the new month's counter.
        let next_month = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let decision = meter.can_send("ins-1", "conv-1", next_month).await.unwrap();
        assert!(decision.allowed);
        assert!(!decision.is_first_charge);

        assert!(!meter.charge("ins-1", "conv-1", next_month).await.unwrap());
        let summary = meter.usage_summary("ins-1", next_month).await.unwrap();
        assert_eq!(summary.used, 0, "new month counter untouched");
    }

    #[tokio::test]
    async fn quota_resets_for_new_conversations_each_month() {
        let meter = free_tier_meter().await;
        let now = march();
        for i in 0..7 {
            meter.charge("ins-1", &format!("conv-{i}"), now).await.unwrap();
        }
        assert!(!meter.can_send("ins-1", "conv-new", now).await.unwrap().allowed);

        let next_month = Utc.with_ymd_and_hms(2026, 4, 2, 9, 0, 0).unwrap();
        let decision = meter.can_send("ins-1", "conv-new", next_month).await.unwrap();
        assert!(decision.allowed);
        assert!(decision.is_first_charge);
    }

    #[tokio::test]
    async fn live_plan_bypasses_metering() {
        let now = march();
        let mut plans = HashMap::new();
        plans.insert(
            "ins-pro".to_string(),
            Subscription {
                active: true,
                expires_at: now + Duration::days(20),
            },
        );
        let meter = meter_with_plans(plans).await;

        for i in 0..20 {
            let decision = meter
                .can_send("ins-pro", &format!("conv-{i}"), now)
                .await
                .unwrap();
            assert!(decision.allowed);
            assert!(decision.has_active_plan);
            assert_eq!(decision.limit, None);
        }

        let summary = meter.usage_summary("ins-pro", now).await.unwrap();
        assert!(summary.has_active_plan);
        assert_eq!(summary.remaining, None);
    }

    #[tokio::test]
    async fn expired_plan_is_metered() {
        let now = march();
        let mut plans = HashMap::new();
        plans.insert(
            "ins-lapsed".to_string(),
            Subscription {
                active: true,
                expires_at: now - Duration::days(1),
            },
        );
        let meter = meter_with_plans(plans).await;

        let decision = meter.can_send("ins-lapsed", "conv-1", now).await.unwrap();
        assert!(!decision.has_active_plan);
        assert_eq!(decision.limit, Some(7));
    }

    #[tokio::test]
    async fn summary_reports_near_limit_and_renewal() {
        let meter = free_tier_meter().await;
        let now = march();
        for i in 0..5 {
            meter.charge("ins-1", &format!("conv-{i}"), now).await.unwrap();
        }

        let summary = meter.usage_summary("ins-1", now).await.unwrap();
        assert_eq!(summary.used, 5);
        assert_eq!(summary.remaining, Some(2));
        assert!(summary.near_limit);
        assert_eq!(
            summary.renews_at,
            Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn next_month_start_handles_december() {
        let december = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            next_month_start(december).unwrap(),
            Utc.with_ymd_and_hms(2027, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
