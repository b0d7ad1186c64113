// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Wheelhouse workspace.
//!
//! Record structs mirror the durable tables one-to-one and are re-exported by
//! `wheelhouse-storage`. Timestamps are ISO 8601 UTC strings with millisecond
//! precision so that lexical ordering matches chronological ordering in
//! SQLite TEXT columns.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How long a new request stays claimable before it expires.
pub const REQUEST_TTL_DAYS: i64 = 30;

/// Caller role, resolved by the external profile store on every decision.
///
/// A closed enum: an unrecognized role string is a parse error, never a
/// silent fall-through to "allowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

/// Service request lifecycle states.
///
/// `Expired` is a derived state for requests still `New` past their
/// `expires_at`; it is observed on read before any sweep persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum RequestStatus {
    New,
    Viewed,
    Responded,
    Agreed,
    Completed,
    Canceled,
    Expired,
}

impl RequestStatus {
    /// The set of statuses reachable from this one.
    ///
    /// Strictly forward-only; re-applying the current status is not allowed.
    pub fn allowed_next(self) -> &'static [RequestStatus] {
        use RequestStatus::*;
        match self {
            New => &[Viewed, Canceled],
            Viewed => &[Responded, Canceled],
            Responded => &[Agreed, Canceled],
            Agreed => &[Completed, Canceled],
            Completed | Canceled | Expired => &[],
        }
    }

    pub fn can_transition_to(self, target: RequestStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

/// Kind of message carried through the external transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    File,
}

/// Audited action kinds. The audit ledger stores these as TEXT, and the rate
/// limiter buckets its windows by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum ActionKind {
    CreateRequest,
    TransitionRequest,
    SendMessage,
    UploadAttachment,
    MarkRead,
}

/// A student's ask for instruction services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: String,
    pub student_id: String,
    /// None until an instructor claims the request; immutable once set.
    pub instructor_id: Option<String>,
    pub status: RequestStatus,
    pub category: String,
    pub city: String,
    /// Student's stated budget, in minor currency units.
    pub budget: Option<i64>,
    pub created_at: String,
    pub expires_at: String,
}

impl ServiceRequest {
    /// The status this request should be treated as at `now`, before any
    /// expiry sweep has persisted `Expired`.
    pub fn effective_status(&self, now: DateTime<Utc>) -> RequestStatus {
        if self.status == RequestStatus::New && format_ts(now) > self.expires_at {
            RequestStatus::Expired
        } else {
            self.status
        }
    }
}

/// The 1:1 messaging channel for a request, created when an instructor first
/// responds. Participants mirror the request's at creation time and never
/// change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub request_id: String,
    pub student_id: String,
    pub instructor_id: String,
    pub created_at: String,
}

impl Conversation {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.student_id == user_id || self.instructor_id == user_id
    }
}

/// Per-instructor, per-calendar-month conversation counter. Lazily created;
/// monotonically non-decreasing within its period. The free-tier gate lives
/// in the quota meter, not in this row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyChatUsage {
    pub id: String,
    pub instructor_id: String,
    pub year: i32,
    pub month: u32,
    pub used_conversations: u32,
}

/// Idempotency marker: existence of a row means the conversation has been
/// charged against the instructor's quota. Uniqueness is on
/// (instructor_id, conversation_id) — a conversation is charged at most once,
/// ever; year/month record which period absorbed the charge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationUsageLog {
    pub id: String,
    pub instructor_id: String,
    pub conversation_id: String,
    pub year: i32,
    pub month: u32,
    pub created_at: String,
}

/// One append-only audit row. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub actor_id: String,
    pub action: ActionKind,
    pub resource_type: String,
    pub resource_id: String,
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

/// An active-plan snapshot from the external subscription store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub active: bool,
    pub expires_at: DateTime<Utc>,
}

impl Subscription {
    /// Active and not yet expired at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at > now
    }
}

/// Ban state for a user, with optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanStatus {
    pub banned: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl BanStatus {
    pub fn not_banned() -> Self {
        Self {
            banned: false,
            expires_at: None,
        }
    }

    /// Whether the ban is in force at `now`. An expired ban does not block.
    pub fn in_force(&self, now: DateTime<Utc>) -> bool {
        self.banned && self.expires_at.is_none_or(|until| until > now)
    }
}

/// Format a timestamp the way every durable column stores it.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Expiry timestamp for a request created at `created_at`.
pub fn request_expiry(created_at: DateTime<Utc>) -> DateTime<Utc> {
    created_at + Duration::days(REQUEST_TTL_DAYS)
}
