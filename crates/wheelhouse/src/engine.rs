// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The coordination engine facade.
//!
//! Composes the lifecycle state machine, chat quota meter, rate limiter and
//! audit ledger over one database handle, plus the three external
//! collaborators (profiles, subscriptions, message transport). Every
//! operation takes the caller's identity as a parameter; authentication
//! happens upstream.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use wheelhouse_audit::AuditLedger;
use wheelhouse_config::WheelhouseConfig;
use wheelhouse_core::types::{ActionKind, Conversation, MessageKind, RequestStatus, Role, ServiceRequest};
use wheelhouse_core::{MessageTransport, RoleOracle, SubscriptionStore, WheelhouseError};
use wheelhouse_lifecycle::{LifecycleEngine, NewRequest, TransitionOutcome};
use wheelhouse_quota::{ChatQuota, QuotaDecision, UsageSummary};
use wheelhouse_ratelimit::{RateBucket, RateDecision, RateLimiter};
use wheelhouse_storage::{queries, Database};

/// The assembled coordination engine.
///
/// Cheap to clone; all clones share the single writer connection.
#[derive(Clone)]
pub struct Engine {
    db: Database,
    roles: Arc<dyn RoleOracle>,
    transport: Arc<dyn MessageTransport>,
    audit: AuditLedger,
    limiter: RateLimiter,
    quota: ChatQuota,
    lifecycle: LifecycleEngine,
}

impl Engine {
    /// Open (or create) the configured database and assemble the engine.
    pub async fn open(
        config: WheelhouseConfig,
        roles: Arc<dyn RoleOracle>,
        subscriptions: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn MessageTransport>,
    ) -> Result<Self, WheelhouseError> {
        let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
        Ok(Self::with_database(
            db,
            config,
            roles,
            subscriptions,
            transport,
        ))
    }

    /// Assemble the engine over an already-opened database.
    pub fn with_database(
        db: Database,
        config: WheelhouseConfig,
        roles: Arc<dyn RoleOracle>,
        subscriptions: Arc<dyn SubscriptionStore>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        let audit = AuditLedger::new(db.clone());
        let limiter = RateLimiter::new(audit.clone(), config.ratelimit.clone());
        let quota = ChatQuota::new(db.clone(), subscriptions, config.quota.clone());
        let lifecycle = LifecycleEngine::new(
            db.clone(),
            Arc::clone(&roles),
            Arc::clone(&transport),
            audit.clone(),
        );
        info!("coordination engine assembled");
        Self {
            db,
            roles,
            transport,
            audit,
            limiter,
            quota,
            lifecycle,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Flush and release the underlying connection.
    pub async fn close(&self) -> Result<(), WheelhouseError> {
        self.db.close().await
    }

    /// Reject callers whose ban is currently in force.
    async fn ensure_not_banned(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WheelhouseError> {
        let ban = self.roles.is_banned(user_id).await?;
        if ban.in_force(now) {
            return Err(WheelhouseError::Forbidden(format!(
                "user {user_id} is banned"
            )));
        }
        Ok(())
    }

    /// Create a service request on behalf of a student.
    ///
    /// Ban check, then the create-request rate window, then the insert; the
    /// audit entry written on success is what the next rate check counts.
    pub async fn create_request(
        &self,
        student_id: &str,
        params: NewRequest,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, WheelhouseError> {
        self.ensure_not_banned(student_id, now).await?;
        self.limiter
            .enforce(student_id, RateBucket::CreateRequest, now)
            .await?;
        self.lifecycle.create_request(student_id, params, now).await
    }

    pub async fn get_request(&self, request_id: &str) -> Result<ServiceRequest, WheelhouseError> {
        self.lifecycle.get_request(request_id).await
    }

    /// Apply one status transition. The caller's role is resolved live from
    /// the profile store. Responded is not reachable through this path; use
    /// [`respond_to_request`], which carries the opening message.
    ///
    /// [`respond_to_request`]: Engine::respond_to_request
    pub async fn request_transition(
        &self,
        request_id: &str,
        caller_id: &str,
        target: RequestStatus,
        payload: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WheelhouseError> {
        self.ensure_not_banned(caller_id, now).await?;
        let role = self.roles.get_role(caller_id).await?;
        self.lifecycle
            .transition(request_id, caller_id, role, target, payload, None, now)
            .await
    }

    /// Instructor responds to a request: claims it, opens the conversation
    /// and sends the opening message in one retry-safe operation.
    ///
    /// The opening message is the instructor's first message into the
    /// conversation, so it runs through the message rate window and the chat
    /// quota like any other send.
    pub async fn respond_to_request(
        &self,
        request_id: &str,
        instructor_id: &str,
        opening_message: &str,
        payload: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WheelhouseError> {
        self.ensure_not_banned(instructor_id, now).await?;
        // Existence first, so a dead request id surfaces as NotFound rather
        // than a throttling error.
        self.lifecycle.get_request(request_id).await?;
        self.limiter
            .enforce(instructor_id, RateBucket::SendMessage, now)
            .await?;

        // Quota probe: a retry reuses the existing conversation and keeps its
        // lifetime bypass; a fresh claim probes with an unknown id, which
        // reduces to the plain free-slot capacity check.
        let probe_id = queries::conversations::get_by_request(&self.db, request_id)
            .await?
            .map(|c| c.id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.quota.enforce(instructor_id, &probe_id, now).await?;

        let outcome = self
            .lifecycle
            .respond(request_id, instructor_id, opening_message, payload, now)
            .await?;

        if let Some(conversation) = &outcome.conversation {
            self.quota
                .charge(instructor_id, &conversation.id, now)
                .await?;
            let entry = AuditLedger::entry(
                instructor_id,
                ActionKind::SendMessage,
                "conversation",
                &conversation.id,
                Some(serde_json::json!({
                    "message_id": outcome.opening_message_id,
                    "kind": MessageKind::Text.to_string(),
                    "opening": true,
                })),
                now,
            );
            self.audit.record_best_effort(&entry).await;
        }
        Ok(outcome)
    }

    /// Send a message (or attachment) into a conversation.
    ///
    /// Order: participant check, ban check, the bucket matching the message
    /// kind, quota for metered senders, transport persist, quota charge,
    /// audit. The quota applies only to the conversation's instructor;
    /// students and admins are never metered.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        kind: MessageKind,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<String, WheelhouseError> {
        let role = self.roles.get_role(sender_id).await?;
        let conversation = self
            .lifecycle
            .authorize_message(conversation_id, sender_id, role)
            .await?;
        self.ensure_not_banned(sender_id, now).await?;

        let bucket = match kind {
            MessageKind::Text => RateBucket::SendMessage,
            MessageKind::File => RateBucket::UploadAttachment,
        };
        self.limiter.enforce(sender_id, bucket, now).await?;

        let metered = role == Role::Instructor && conversation.instructor_id == sender_id;
        if metered {
            self.quota.enforce(sender_id, conversation_id, now).await?;
        }

        let message_id = self
            .transport
            .persist_message(conversation_id, sender_id, kind, content)
            .await?;

        // Charge strictly after the message exists; idempotent on retries.
        if metered {
            self.quota.charge(sender_id, conversation_id, now).await?;
        }

        let entry = AuditLedger::entry(
            sender_id,
            bucket.action(),
            "conversation",
            conversation_id,
            Some(serde_json::json!({
                "message_id": message_id,
                "kind": kind.to_string(),
            })),
            now,
        );
        self.audit.record_best_effort(&entry).await;
        Ok(message_id)
    }

    /// Mark a conversation read for the caller. Participant-gated; audited,
    /// not rate limited.
    pub async fn mark_read(
        &self,
        conversation_id: &str,
        caller_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WheelhouseError> {
        let role = self.roles.get_role(caller_id).await?;
        self.lifecycle
            .authorize_message(conversation_id, caller_id, role)
            .await?;
        let entry = AuditLedger::entry(
            caller_id,
            ActionKind::MarkRead,
            "conversation",
            conversation_id,
            None,
            now,
        );
        self.audit.record_best_effort(&entry).await;
        Ok(())
    }

    /// Whether `caller_id` may write into the conversation right now.
    pub async fn can_send_message(
        &self,
        conversation_id: &str,
        caller_id: &str,
    ) -> Result<bool, WheelhouseError> {
        let role = self.roles.get_role(caller_id).await?;
        self.lifecycle
            .can_send_message(conversation_id, caller_id, role)
            .await
    }

    pub async fn get_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Conversation, WheelhouseError> {
        queries::conversations::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| WheelhouseError::NotFound {
                resource: "conversation",
                id: conversation_id.to_string(),
            })
    }

    /// Non-throwing quota probe for UI affordances (e.g. disabling the
    /// composer before the instructor types a message).
    pub async fn check_quota(
        &self,
        instructor_id: &str,
        conversation_id: &str,
        now: DateTime<Utc>,
    ) -> Result<QuotaDecision, WheelhouseError> {
        self.quota.can_send(instructor_id, conversation_id, now).await
    }

    /// Non-throwing rate window probe for UI affordances.
    pub async fn check_rate_limit(
        &self,
        actor_id: &str,
        bucket: RateBucket,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, WheelhouseError> {
        self.limiter.check(actor_id, bucket, now).await
    }

    /// Quota snapshot for an instructor.
    pub async fn usage_summary(
        &self,
        instructor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<UsageSummary, WheelhouseError> {
        self.quota.usage_summary(instructor_id, now).await
    }

    /// Persist Expired for overdue New requests. Safe to run from a periodic
    /// job at any cadence.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, WheelhouseError> {
        self.lifecycle.sweep_expired(now).await
    }

    /// Most recent audit entries for one actor, newest first.
    pub async fn recent_activity(
        &self,
        actor_id: &str,
        limit: i64,
    ) -> Result<Vec<wheelhouse_core::types::AuditLogEntry>, WheelhouseError> {
        self.audit.recent_for_actor(actor_id, limit).await
    }
}
