// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quota counter and charge-log operations.
//!
//! The monthly counter row is created lazily with INSERT OR IGNORE; the
//! unique constraint on (instructor_id, year, month) resolves creation races
//! and the loser simply reads the winner's row. The charge itself is a
//! single transaction keyed by the uniqueness of the charge-log row, so two
//! concurrent first-messages can never lose an increment.

use rusqlite::params;

use wheelhouse_core::WheelhouseError;

use crate::database::Database;
use crate::models::{ConversationUsageLog, MonthlyChatUsage};

fn map_usage_row(row: &rusqlite::Row<'_>) -> Result<MonthlyChatUsage, rusqlite::Error> {
    Ok(MonthlyChatUsage {
        id: row.get(0)?,
        instructor_id: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        used_conversations: row.get(4)?,
    })
}

/// Get-or-create the counter row for (instructor, year, month).
///
/// `candidate_id` is used only if this call wins the creation race.
pub async fn ensure_month_row(
    db: &Database,
    instructor_id: &str,
    year: i32,
    month: u32,
    candidate_id: &str,
) -> Result<MonthlyChatUsage, WheelhouseError> {
    let instructor_id = instructor_id.to_string();
    let candidate_id = candidate_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO monthly_chat_usage \
                 (id, instructor_id, year, month, used_conversations) \
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![candidate_id, instructor_id, year, month],
            )?;
            conn.query_row(
                "SELECT id, instructor_id, year, month, used_conversations \
                 FROM monthly_chat_usage \
                 WHERE instructor_id = ?1 AND year = ?2 AND month = ?3",
                params![instructor_id, year, month],
                map_usage_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Counter row for (instructor, year, month), if one exists.
pub async fn month_usage(
    db: &Database,
    instructor_id: &str,
    year: i32,
    month: u32,
) -> Result<Option<MonthlyChatUsage>, WheelhouseError> {
    let instructor_id = instructor_id.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT id, instructor_id, year, month, used_conversations \
                 FROM monthly_chat_usage \
                 WHERE instructor_id = ?1 AND year = ?2 AND month = ?3",
                params![instructor_id, year, month],
                map_usage_row,
            );
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether this conversation has ever been charged against the instructor's
/// quota. Deliberately not scoped by period: a conversation is charged at
/// most once, ever.
pub async fn is_conversation_charged(
    db: &Database,
    instructor_id: &str,
    conversation_id: &str,
) -> Result<bool, WheelhouseError> {
    let instructor_id = instructor_id.to_string();
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM conversation_usage_log \
                 WHERE instructor_id = ?1 AND conversation_id = ?2",
                params![instructor_id, conversation_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Charge one conversation against the instructor's quota, exactly once.
///
/// In a single transaction: INSERT OR IGNORE the charge-log row; only if it
/// was newly inserted, upsert-increment the monthly counter by one.
/// `counter_candidate_id` is used if the counter row does not exist yet.
/// Returns true when this call performed the charge, false when the
/// conversation was already charged.
pub async fn charge_conversation(
    db: &Database,
    log: ConversationUsageLog,
    counter_candidate_id: &str,
) -> Result<bool, WheelhouseError> {
    let counter_candidate_id = counter_candidate_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = tx.execute(
                "INSERT OR IGNORE INTO conversation_usage_log \
                 (id, instructor_id, conversation_id, year, month, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    log.id,
                    log.instructor_id,
                    log.conversation_id,
                    log.year,
                    log.month,
                    log.created_at,
                ],
            )?;
            if inserted == 1 {
                tx.execute(
                    "INSERT INTO monthly_chat_usage \
                     (id, instructor_id, year, month, used_conversations) \
                     VALUES (?1, ?2, ?3, ?4, 1) \
                     ON CONFLICT (instructor_id, year, month) \
                     DO UPDATE SET used_conversations = used_conversations + 1",
                    params![counter_candidate_id, log.instructor_id, log.year, log.month],
                )?;
            }
            tx.commit()?;
            Ok(inserted == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
