// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Audit log operations. Append and read only; rows are never updated or
//! deleted.

use std::str::FromStr;

use rusqlite::params;

use wheelhouse_core::types::ActionKind;
use wheelhouse_core::WheelhouseError;

use crate::database::Database;
use crate::models::AuditLogEntry;

fn map_entry_row(row: &rusqlite::Row<'_>) -> Result<AuditLogEntry, rusqlite::Error> {
    let action: String = row.get(2)?;
    let details: Option<String> = row.get(5)?;
    let details = match details {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?),
        None => None,
    };
    Ok(AuditLogEntry {
        id: row.get(0)?,
        actor_id: row.get(1)?,
        action: ActionKind::from_str(&action).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        resource_type: row.get(3)?,
        resource_id: row.get(4)?,
        details,
        created_at: row.get(6)?,
    })
}

/// Append one audit row.
pub async fn append(db: &Database, entry: &AuditLogEntry) -> Result<(), WheelhouseError> {
    let entry = entry.clone();
    let details = entry.details.as_ref().map(|d| d.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO audit_log \
                 (id, actor_id, action, resource_type, resource_id, details, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    entry.id,
                    entry.actor_id,
                    entry.action.to_string(),
                    entry.resource_type,
                    entry.resource_id,
                    details,
                    entry.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count entries by one actor for one action since a timestamp (inclusive).
/// The rate limiter's sliding-window source.
pub async fn count_since(
    db: &Database,
    actor_id: &str,
    action: ActionKind,
    since_ts: &str,
) -> Result<u32, WheelhouseError> {
    let actor_id = actor_id.to_string();
    let since_ts = since_ts.to_string();
    db.connection()
        .call(move |conn| {
            let count: u32 = conn.query_row(
                "SELECT COUNT(*) FROM audit_log \
                 WHERE actor_id = ?1 AND action = ?2 AND created_at >= ?3",
                params![actor_id, action.to_string(), since_ts],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent entries for an actor, newest first.
pub async fn recent_for_actor(
    db: &Database,
    actor_id: &str,
    limit: i64,
) -> Result<Vec<AuditLogEntry>, WheelhouseError> {
    let actor_id = actor_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, actor_id, action, resource_type, resource_id, details, created_at \
                 FROM audit_log WHERE actor_id = ?1 \
                 ORDER BY created_at DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![actor_id, limit], map_entry_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use wheelhouse_core::types::format_ts;

    fn entry(actor: &str, action: ActionKind, created_at: &str) -> AuditLogEntry {
        AuditLogEntry {
            id: uuid::Uuid::new_v4().to_string(),
            actor_id: actor.to_string(),
            action,
            resource_type: "request".to_string(),
            resource_id: "req-1".to_string(),
            details: Some(serde_json::json!({"from": "New", "to": "Viewed"})),
            created_at: created_at.to_string(),
        }
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let db = Database::open_in_memory().await.unwrap();
        let ts = format_ts(Utc::now());
        append(&db, &entry("user-1", ActionKind::TransitionRequest, &ts))
            .await
            .unwrap();

        let entries = recent_for_actor(&db, "user-1", 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ActionKind::TransitionRequest);
        assert_eq!(entries[0].details.as_ref().unwrap()["to"], "Viewed");
    }

    #[tokio::test]
    async fn count_since_windows_by_action_and_time() {
        let db = Database::open_in_memory().await.unwrap();
        let now = Utc::now();

        // Two recent sends, one old send, one recent create, other actor.
        for offset_secs in [10, 20] {
            let ts = format_ts(now - Duration::seconds(offset_secs));
            append(&db, &entry("user-1", ActionKind::SendMessage, &ts))
                .await
                .unwrap();
        }
        let old = format_ts(now - Duration::seconds(7200));
        append(&db, &entry("user-1", ActionKind::SendMessage, &old))
            .await
            .unwrap();
        let ts = format_ts(now - Duration::seconds(5));
        append(&db, &entry("user-1", ActionKind::CreateRequest, &ts))
            .await
            .unwrap();
        append(&db, &entry("user-2", ActionKind::SendMessage, &ts))
            .await
            .unwrap();

        let since = format_ts(now - Duration::seconds(3600));
        let count = count_since(&db, "user-1", ActionKind::SendMessage, &since)
            .await
            .unwrap();
        assert_eq!(count, 2);
        let count = count_since(&db, "user-1", ActionKind::CreateRequest, &since)
            .await
            .unwrap();
        assert_eq!(count, 1);
        let count = count_since(&db, "user-2", ActionKind::SendMessage, &since)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let db = Database::open_in_memory().await.unwrap();
        let now = Utc::now();
        for i in 0..3 {
            let ts = format_ts(now - Duration::seconds(i * 60));
            append(&db, &entry("user-1", ActionKind::SendMessage, &ts))
                .await
                .unwrap();
        }
        let entries = recent_for_actor(&db, "user-1", 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].created_at > entries[1].created_at);
    }
}
