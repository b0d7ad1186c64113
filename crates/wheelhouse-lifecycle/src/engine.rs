// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request lifecycle engine.
//!
//! Owns every status change of a service request. Transitions are validated
//! in a fixed order — existence, transition table, permission matrix,
//! verification — then applied with a conditional update so concurrent
//! writers serialize per request: the loser sees zero rows affected and gets
//! `Conflict` instead of silently overwriting.
//!
//! Expiry is virtual first: every decision path goes through
//! `effective_status`, so a New request past its deadline acts Expired even
//! before `sweep_expired` persists it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use wheelhouse_audit::AuditLedger;
use wheelhouse_core::types::{
    format_ts, request_expiry, ActionKind, Conversation, MessageKind, RequestStatus, Role,
    ServiceRequest,
};
use wheelhouse_core::{MessageTransport, RoleOracle, WheelhouseError};
use wheelhouse_storage::{queries, Database};

use crate::permissions;

/// Parameters for a new service request.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub category: String,
    pub city: String,
    pub budget: Option<i64>,
}

/// The result of a successful transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub request: ServiceRequest,
    /// Present for Responded: the conversation scoped to the request.
    pub conversation: Option<Conversation>,
    /// Present when this call persisted the instructor's opening message.
    pub opening_message_id: Option<String>,
}

/// State machine and permission gate for service requests.
#[derive(Clone)]
pub struct LifecycleEngine {
    db: Database,
    roles: Arc<dyn RoleOracle>,
    transport: Arc<dyn MessageTransport>,
    audit: AuditLedger,
}

impl LifecycleEngine {
    pub fn new(
        db: Database,
        roles: Arc<dyn RoleOracle>,
        transport: Arc<dyn MessageTransport>,
        audit: AuditLedger,
    ) -> Self {
        Self {
            db,
            roles,
            transport,
            audit,
        }
    }

    /// Create a request on behalf of a student. Status starts at New and the
    /// request expires 30 days out.
    pub async fn create_request(
        &self,
        student_id: &str,
        params: NewRequest,
        now: DateTime<Utc>,
    ) -> Result<ServiceRequest, WheelhouseError> {
        let role = self.roles.get_role(student_id).await?;
        if role != Role::Student {
            return Err(WheelhouseError::Forbidden(
                "only students create service requests".into(),
            ));
        }

        let request = ServiceRequest {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            instructor_id: None,
            status: RequestStatus::New,
            category: params.category,
            city: params.city,
            budget: params.budget,
            created_at: format_ts(now),
            expires_at: format_ts(request_expiry(now)),
        };
        queries::requests::insert_request(&self.db, &request).await?;
        info!(request_id = %request.id, student_id, "service request created");

        let entry = AuditLedger::entry(
            student_id,
            ActionKind::CreateRequest,
            "request",
            &request.id,
            Some(serde_json::json!({
                "category": request.category,
                "city": request.city,
            })),
            now,
        );
        self.audit.record_best_effort(&entry).await;
        Ok(request)
    }

    pub async fn get_request(&self, request_id: &str) -> Result<ServiceRequest, WheelhouseError> {
        queries::requests::get_request(&self.db, request_id)
            .await?
            .ok_or_else(|| WheelhouseError::NotFound {
                resource: "request",
                id: request_id.to_string(),
            })
    }

    /// Apply one transition from the table.
    ///
    /// Check order: NotFound, then InvalidTransition (against the effective
    /// status, so expiry is honored before any sweep), then the permission
    /// matrix, then instructor verification for Responded.
    pub async fn transition(
        &self,
        request_id: &str,
        caller_id: &str,
        caller_role: Role,
        target: RequestStatus,
        payload: Option<serde_json::Value>,
        opening_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WheelhouseError> {
        let request = self.get_request(request_id).await?;
        let current = request.effective_status(now);

        if !current.can_transition_to(target) {
            return Err(WheelhouseError::InvalidTransition {
                from: current,
                to: target,
            });
        }
        permissions::check_transition(&request, caller_id, caller_role, target)?;

        let outcome = if target == RequestStatus::Responded {
            self.apply_responded(&request, caller_id, caller_role, current, opening_message, now)
                .await?
        } else {
            self.apply_plain(&request, current, target).await?
        };

        let entry = AuditLedger::entry(
            caller_id,
            ActionKind::TransitionRequest,
            "request",
            request_id,
            Some(serde_json::json!({
                "from": current.to_string(),
                "to": target.to_string(),
                "payload": payload,
            })),
            now,
        );
        self.audit.record_best_effort(&entry).await;
        Ok(outcome)
    }

    /// Conditional single-column update for every target except Responded.
    async fn apply_plain(
        &self,
        request: &ServiceRequest,
        current: RequestStatus,
        target: RequestStatus,
    ) -> Result<TransitionOutcome, WheelhouseError> {
        let moved =
            queries::requests::update_status(&self.db, &request.id, current, target).await?;
        if !moved {
            let fresh = self.get_request(&request.id).await?;
            return Err(WheelhouseError::Conflict(format!(
                "request {} moved to {} underneath this transition; re-read and retry",
                request.id, fresh.status
            )));
        }
        debug!(request_id = %request.id, %current, %target, "transition applied");
        let mut updated = request.clone();
        updated.status = target;
        Ok(TransitionOutcome {
            request: updated,
            conversation: None,
            opening_message_id: None,
        })
    }

    /// The three-effect Responded bundle.
    ///
    /// Status change + instructor assignment + conversation creation commit
    /// in one storage transaction; the opening message goes to the external
    /// transport afterwards. A retry after a transport failure reuses the
    /// conversation row instead of creating a duplicate.
    async fn apply_responded(
        &self,
        request: &ServiceRequest,
        caller_id: &str,
        caller_role: Role,
        current: RequestStatus,
        opening_message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WheelhouseError> {
        let assignee = match (&request.instructor_id, caller_role) {
            (Some(assigned), _) => assigned.clone(),
            (None, Role::Instructor) => caller_id.to_string(),
            // Admins can apply allowed transitions but cannot stand in as
            // the claiming instructor.
            (None, _) => {
                return Err(WheelhouseError::Forbidden(
                    "responding to an unassigned request requires an instructor".into(),
                ));
            }
        };
        if caller_role == Role::Instructor
            && !self.roles.is_verified_instructor(caller_id).await?
        {
            return Err(WheelhouseError::Forbidden(
                "unverified instructors cannot respond to requests".into(),
            ));
        }
        let opening_message = opening_message.ok_or_else(|| {
            WheelhouseError::Internal("responded transition requires an opening message".into())
        })?;

        let candidate = Conversation {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: request.id.clone(),
            student_id: request.student_id.clone(),
            instructor_id: assignee.clone(),
            created_at: format_ts(now),
        };
        let claimed = queries::requests::claim_for_response(
            &self.db,
            &request.id,
            current,
            &assignee,
            candidate,
        )
        .await?;

        let conversation = match claimed {
            Some(conversation) => conversation,
            None => {
                let fresh = self.get_request(&request.id).await?;
                return Err(WheelhouseError::Conflict(format!(
                    "request {} was claimed concurrently (now {})",
                    request.id, fresh.status
                )));
            }
        };

        let message_id = self
            .transport
            .persist_message(
                &conversation.id,
                &assignee,
                MessageKind::Text,
                opening_message,
            )
            .await?;
        info!(
            request_id = %request.id,
            conversation_id = %conversation.id,
            instructor_id = %assignee,
            "request claimed and conversation opened"
        );

        let mut updated = request.clone();
        updated.status = RequestStatus::Responded;
        updated.instructor_id = Some(assignee);
        Ok(TransitionOutcome {
            request: updated,
            conversation: Some(conversation),
            opening_message_id: Some(message_id),
        })
    }

    /// Instructor-facing respond flow: verification and permissions are
    /// checked before any state moves, then the implicit Viewed hop is
    /// applied if the request is still New, then the strict Responded
    /// transition runs. A repeat call by the assigned instructor reuses the
    /// existing conversation and re-sends the opening message, so the whole
    /// operation is safe to retry.
    pub async fn respond(
        &self,
        request_id: &str,
        instructor_id: &str,
        opening_message: &str,
        payload: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WheelhouseError> {
        let request = self.get_request(request_id).await?;
        let current = request.effective_status(now);

        // Nothing may move for an unverified instructor, including the
        // implicit Viewed hop.
        if !self.roles.is_verified_instructor(instructor_id).await? {
            return Err(WheelhouseError::Forbidden(
                "unverified instructors cannot respond to requests".into(),
            ));
        }

        // Retry path: already claimed by this instructor.
        if current == RequestStatus::Responded
            && request.instructor_id.as_deref() == Some(instructor_id)
        {
            let conversation = queries::conversations::get_by_request(&self.db, request_id)
                .await?
                .ok_or_else(|| WheelhouseError::NotFound {
                    resource: "conversation",
                    id: request_id.to_string(),
                })?;
            let message_id = self
                .transport
                .persist_message(
                    &conversation.id,
                    instructor_id,
                    MessageKind::Text,
                    opening_message,
                )
                .await?;
            let mut updated = request.clone();
            updated.status = RequestStatus::Responded;
            return Ok(TransitionOutcome {
                request: updated,
                conversation: Some(conversation),
                opening_message_id: Some(message_id),
            });
        }

        if current == RequestStatus::New {
            permissions::check_transition(
                &request,
                instructor_id,
                Role::Instructor,
                RequestStatus::Viewed,
            )?;
            // A lost race here just means someone else viewed it first;
            // the Responded transition below re-reads either way.
            let _ = queries::requests::update_status(
                &self.db,
                request_id,
                RequestStatus::New,
                RequestStatus::Viewed,
            )
            .await?;
        }

        self.transition(
            request_id,
            instructor_id,
            Role::Instructor,
            RequestStatus::Responded,
            payload,
            Some(opening_message),
            now,
        )
        .await
    }

    /// Look up a conversation and authorize the caller for it.
    pub async fn authorize_message(
        &self,
        conversation_id: &str,
        caller_id: &str,
        caller_role: Role,
    ) -> Result<Conversation, WheelhouseError> {
        let conversation = queries::conversations::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| WheelhouseError::NotFound {
                resource: "conversation",
                id: conversation_id.to_string(),
            })?;
        if !permissions::can_send_message(&conversation, caller_id, caller_role) {
            return Err(WheelhouseError::Forbidden(
                "caller is not a participant of this conversation".into(),
            ));
        }
        Ok(conversation)
    }

    /// Messaging permission as a plain boolean; NotFound still surfaces.
    pub async fn can_send_message(
        &self,
        conversation_id: &str,
        caller_id: &str,
        caller_role: Role,
    ) -> Result<bool, WheelhouseError> {
        match self
            .authorize_message(conversation_id, caller_id, caller_role)
            .await
        {
            Ok(_) => Ok(true),
            Err(WheelhouseError::Forbidden(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Persist Expired for overdue New requests. Idempotent; the virtual
    /// expiry in `effective_status` makes this eventually-consistent sweep
    /// safe to delay, cancel, or re-run.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, WheelhouseError> {
        let swept = queries::requests::sweep_expired(&self.db, &format_ts(now)).await?;
        if swept > 0 {
            info!(swept, "expired requests persisted");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use wheelhouse_core::types::BanStatus;

    struct StaticRoles {
        verified: HashSet<String>,
    }

    #[async_trait]
    impl RoleOracle for StaticRoles {
        async fn get_role(&self, user_id: &str) -> Result<Role, WheelhouseError> {
            if user_id.starts_with("stu-") {
                Ok(Role::Student)
            } else if user_id.starts_with("ins-") {
                Ok(Role::Instructor)
            } else {
                Ok(Role::Admin)
            }
        }

        async fn is_verified_instructor(&self, user_id: &str) -> Result<bool, WheelhouseError> {
            Ok(self.verified.contains(user_id))
        }

        async fn is_banned(&self, _user_id: &str) -> Result<BanStatus, WheelhouseError> {
            Ok(BanStatus::not_banned())
        }
    }

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl MessageTransport for RecordingTransport {
        async fn persist_message(
            &self,
            conversation_id: &str,
            sender_id: &str,
            _kind: MessageKind,
            content: &str,
        ) -> Result<String, WheelhouseError> {
            self.sent.lock().unwrap().push((
                conversation_id.to_string(),
                sender_id.to_string(),
                content.to_string(),
            ));
            Ok(uuid::Uuid::new_v4().to_string())
        }
    }

    async fn engine_with(verified: &[&str]) -> (LifecycleEngine, Arc<RecordingTransport>) {
        let db = Database::open_in_memory().await.unwrap();
        let transport = Arc::new(RecordingTransport::default());
        let engine = LifecycleEngine::new(
            db.clone(),
            Arc::new(StaticRoles {
                verified: verified.iter().map(|s| s.to_string()).collect(),
            }),
            transport.clone(),
            AuditLedger::new(db),
        );
        (engine, transport)
    }

    fn params() -> NewRequest {
        NewRequest {
            category: "category-b".into(),
            city: "Riga".into(),
            budget: Some(15_000),
        }
    }

    #[tokio::test]
    async fn create_sets_new_status_and_expiry() {
        let (engine, _) = engine_with(&[]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();
        assert_eq!(request.status, RequestStatus::New);
        assert_eq!(request.instructor_id, None);
        assert_eq!(request.expires_at, format_ts(now + Duration::days(30)));
    }

    #[tokio::test]
    async fn non_students_cannot_create() {
        let (engine, _) = engine_with(&[]).await;
        let err = engine
            .create_request("ins-1", params(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, WheelhouseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn missing_request_is_not_found() {
        let (engine, _) = engine_with(&[]).await;
        let err = engine
            .transition(
                "req-404",
                "adm-1",
                Role::Admin,
                RequestStatus::Viewed,
                None,
                None,
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WheelhouseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn respond_claims_and_opens_conversation() {
        let (engine, transport) = engine_with(&["ins-1"]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();

        let outcome = engine
            .respond(&request.id, "ins-1", "Hello, I can help", None, now)
            .await
            .unwrap();
        assert_eq!(outcome.request.status, RequestStatus::Responded);
        assert_eq!(outcome.request.instructor_id.as_deref(), Some("ins-1"));
        let conversation = outcome.conversation.unwrap();
        assert_eq!(conversation.student_id, "stu-1");
        assert_eq!(conversation.instructor_id, "ins-1");
        assert!(outcome.opening_message_id.is_some());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].2, "Hello, I can help");
    }

    #[tokio::test]
    async fn unverified_instructor_cannot_respond_and_nothing_moves() {
        let (engine, transport) = engine_with(&[]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();

        let err = engine
            .respond(&request.id, "ins-1", "hi", None, now)
            .await
            .unwrap_err();
        assert!(matches!(err, WheelhouseError::Forbidden(_)));

        let fresh = engine.get_request(&request.id).await.unwrap();
        assert_eq!(fresh.status, RequestStatus::New, "no implicit Viewed hop");
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn respond_retry_reuses_conversation() {
        let (engine, transport) = engine_with(&["ins-1"]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();

        let first = engine
            .respond(&request.id, "ins-1", "offer: 20 EUR/h", None, now)
            .await
            .unwrap();
        let second = engine
            .respond(&request.id, "ins-1", "offer: 20 EUR/h", None, now)
            .await
            .unwrap();
        assert_eq!(
            first.conversation.unwrap().id,
            second.conversation.unwrap().id,
            "one conversation per request"
        );
        assert_eq!(transport.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn second_instructor_is_rejected() {
        let (engine, _) = engine_with(&["ins-1", "ins-2"]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();

        engine
            .respond(&request.id, "ins-1", "hello", None, now)
            .await
            .unwrap();
        let err = engine
            .respond(&request.id, "ins-2", "me too", None, now)
            .await
            .unwrap_err();
        // Already Responded: the strict table rejects a second Responded.
        assert!(matches!(err, WheelhouseError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn full_happy_path_to_completed() {
        let (engine, _) = engine_with(&["ins-1"]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();
        engine
            .respond(&request.id, "ins-1", "hello", None, now)
            .await
            .unwrap();

        let agreed = engine
            .transition(
                &request.id,
                "ins-1",
                Role::Instructor,
                RequestStatus::Agreed,
                Some(serde_json::json!({"price_offered": 20})),
                None,
                now,
            )
            .await
            .unwrap();
        assert_eq!(agreed.request.status, RequestStatus::Agreed);

        let completed = engine
            .transition(
                &request.id,
                "ins-1",
                Role::Instructor,
                RequestStatus::Completed,
                None,
                None,
                now,
            )
            .await
            .unwrap();
        assert_eq!(completed.request.status, RequestStatus::Completed);

        // Terminal: cancel attempts fail, even for an admin.
        let err = engine
            .transition(
                &request.id,
                "adm-1",
                Role::Admin,
                RequestStatus::Canceled,
                None,
                None,
                now,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WheelhouseError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn student_cancels_but_cannot_advance() {
        let (engine, _) = engine_with(&["ins-1"]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();

        // Move to Viewed so Responded is table-legal, then verify the
        // permission matrix still blocks the student.
        engine
            .transition(
                &request.id,
                "ins-1",
                Role::Instructor,
                RequestStatus::Viewed,
                None,
                None,
                now,
            )
            .await
            .unwrap();
        let err = engine
            .transition(
                &request.id,
                "stu-1",
                Role::Student,
                RequestStatus::Responded,
                None,
                Some("hi"),
                now,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, WheelhouseError::Forbidden(_)));

        let canceled = engine
            .transition(
                &request.id,
                "stu-1",
                Role::Student,
                RequestStatus::Canceled,
                Some(serde_json::json!({"reason": "found someone locally"})),
                None,
                now,
            )
            .await
            .unwrap();
        assert_eq!(canceled.request.status, RequestStatus::Canceled);
    }

    #[tokio::test]
    async fn expired_requests_reject_transitions_before_sweep() {
        let (engine, _) = engine_with(&["ins-1"]).await;
        let created = Utc::now() - Duration::days(31);
        let request = engine
            .create_request("stu-1", params(), created)
            .await
            .unwrap();

        let now = Utc::now();
        let err = engine
            .respond(&request.id, "ins-1", "hello", None, now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WheelhouseError::InvalidTransition {
                from: RequestStatus::Expired,
                ..
            }
        ));

        // The sweep persists what effective_status already reported.
        assert_eq!(engine.sweep_expired(now).await.unwrap(), 1);
        let fresh = engine.get_request(&request.id).await.unwrap();
        assert_eq!(fresh.status, RequestStatus::Expired);
        assert_eq!(engine.sweep_expired(now).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn messaging_gate_via_engine() {
        let (engine, _) = engine_with(&["ins-1"]).await;
        let now = Utc::now();
        let request = engine.create_request("stu-1", params(), now).await.unwrap();
        let outcome = engine
            .respond(&request.id, "ins-1", "hello", None, now)
            .await
            .unwrap();
        let conversation = outcome.conversation.unwrap();

        assert!(
            engine
                .can_send_message(&conversation.id, "stu-1", Role::Student)
                .await
                .unwrap()
        );
        assert!(
            !engine
                .can_send_message(&conversation.id, "stu-9", Role::Student)
                .await
                .unwrap()
        );
        let err = engine
            .can_send_message("conv-404", "stu-1", Role::Student)
            .await
            .unwrap_err();
        assert!(matches!(err, WheelhouseError::NotFound { .. }));
    }
}
