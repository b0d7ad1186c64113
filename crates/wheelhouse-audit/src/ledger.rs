// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit ledger.
//!
//! Every business operation records one entry here. The ledger is a side
//! channel: business paths use [`AuditLedger::record_best_effort`], which
//! logs and swallows storage failures so a telemetry outage never fails or
//! rolls back the operation it documents. The same rows feed the rate
//! limiter's sliding windows through [`AuditLedger::count_since`].

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use wheelhouse_core::types::{format_ts, ActionKind, AuditLogEntry};
use wheelhouse_core::WheelhouseError;
use wheelhouse_storage::{queries, Database};

/// Handle to the audit_log table. Cheap to clone; shares the single writer.
#[derive(Clone)]
pub struct AuditLedger {
    db: Database,
}

impl AuditLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Build an entry stamped at `now`.
    pub fn entry(
        actor_id: &str,
        action: ActionKind,
        resource_type: &str,
        resource_id: &str,
        details: Option<serde_json::Value>,
        now: DateTime<Utc>,
    ) -> AuditLogEntry {
        AuditLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id: actor_id.to_string(),
            action,
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
            details,
            created_at: format_ts(now),
        }
    }

    /// Append one entry, surfacing storage failures to the caller.
    pub async fn record(&self, entry: &AuditLogEntry) -> Result<(), WheelhouseError> {
        queries::audit::append(&self.db, entry).await?;
        info!(
            actor_id = %entry.actor_id,
            action = %entry.action,
            resource_type = %entry.resource_type,
            resource_id = %entry.resource_id,
            "audit entry recorded"
        );
        Ok(())
    }

    /// Append one entry, swallowing failures.
    ///
    /// Used on every business path: the primary operation has already
    /// succeeded by the time this runs and must not be failed by the ledger.
    pub async fn record_best_effort(&self, entry: &AuditLogEntry) {
        if let Err(e) = self.record(entry).await {
            warn!(
                actor_id = %entry.actor_id,
                action = %entry.action,
                error = %e,
                "audit append failed; continuing"
            );
        }
    }

    /// Count of one actor's entries for one action since `since` (inclusive).
    pub async fn count_since(
        &self,
        actor_id: &str,
        action: ActionKind,
        since: DateTime<Utc>,
    ) -> Result<u32, WheelhouseError> {
        queries::audit::count_since(&self.db, actor_id, action, &format_ts(since)).await
    }

    /// Most recent entries for an actor, newest first.
    pub async fn recent_for_actor(
        &self,
        actor_id: &str,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, WheelhouseError> {
        queries::audit::recent_for_actor(&self.db, actor_id, limit).await
    }
}
