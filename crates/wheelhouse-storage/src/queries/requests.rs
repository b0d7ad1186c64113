// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service request operations.
//!
//! Status changes go through conditional updates keyed on the expected
//! current status, so a lost race shows up as zero rows affected instead of
//! a silent overwrite. The Responded claim bundles the status change and the
//! conversation creation into one transaction.

use std::str::FromStr;

use rusqlite::params;

use wheelhouse_core::types::RequestStatus;
use wheelhouse_core::WheelhouseError;

use crate::database::Database;
use crate::models::{Conversation, ServiceRequest};

fn parse_status(raw: &str, column: usize) -> Result<RequestStatus, rusqlite::Error> {
    RequestStatus::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_request_row(row: &rusqlite::Row<'_>) -> Result<ServiceRequest, rusqlite::Error> {
    let status: String = row.get(3)?;
    Ok(ServiceRequest {
        id: row.get(0)?,
        student_id: row.get(1)?,
        instructor_id: row.get(2)?,
        status: parse_status(&status, 3)?,
        category: row.get(4)?,
        city: row.get(5)?,
        budget: row.get(6)?,
        created_at: row.get(7)?,
        expires_at: row.get(8)?,
    })
}

pub(crate) fn map_conversation_row(
    row: &rusqlite::Row<'_>,
) -> Result<Conversation, rusqlite::Error> {
    Ok(Conversation {
        id: row.get(0)?,
        request_id: row.get(1)?,
        student_id: row.get(2)?,
        instructor_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

const REQUEST_COLUMNS: &str =
    "id, student_id, instructor_id, status, category, city, budget, created_at, expires_at";

/// Insert a new service request.
pub async fn insert_request(db: &Database, request: &ServiceRequest) -> Result<(), WheelhouseError> {
    let request = request.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO service_requests \
                 (id, student_id, instructor_id, status, category, city, budget, created_at, expires_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    request.id,
                    request.student_id,
                    request.instructor_id,
                    request.status.to_string(),
                    request.category,
                    request.city,
                    request.budget,
                    request.created_at,
                    request.expires_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a request by ID.
pub async fn get_request(db: &Database, id: &str) -> Result<Option<ServiceRequest>, WheelhouseError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {REQUEST_COLUMNS} FROM service_requests WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], map_request_row);
            match result {
                Ok(request) => Ok(Some(request)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Conditionally move a request from `expected` to `next`.
///
/// Returns false when zero rows were affected, i.e. the status moved under
/// us; the caller re-reads and surfaces Conflict or InvalidTransition.
pub async fn update_status(
    db: &Database,
    id: &str,
    expected: RequestStatus,
    next: RequestStatus,
) -> Result<bool, WheelhouseError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE service_requests SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![next.to_string(), id, expected.to_string()],
            )?;
            Ok(updated == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Atomically claim a request for an instructor's response.
///
/// In one transaction: move status from `expected` to Responded while
/// assigning `instructor_id` (only if unassigned or already this
/// instructor), create the conversation if it does not exist yet, and read
/// the conversation back. Returns None when the conditional update lost its
/// race; nothing is written in that case.
pub async fn claim_for_response(
    db: &Database,
    request_id: &str,
    expected: RequestStatus,
    instructor_id: &str,
    conversation: Conversation,
) -> Result<Option<Conversation>, WheelhouseError> {
    let request_id = request_id.to_string();
    let instructor_id = instructor_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let updated = tx.execute(
                "UPDATE service_requests SET status = ?1, instructor_id = ?2 \
                 WHERE id = ?3 AND status = ?4 \
                 AND (instructor_id IS NULL OR instructor_id = ?2)",
                params![
                    RequestStatus::Responded.to_string(),
                    instructor_id,
                    request_id,
                    expected.to_string(),
                ],
            )?;
            if updated == 0 {
                // Dropping the transaction rolls it back.
                return Ok(None);
            }
            tx.execute(
                "INSERT OR IGNORE INTO conversations \
                 (id, request_id, student_id, instructor_id, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    conversation.id,
                    conversation.request_id,
                    conversation.student_id,
                    conversation.instructor_id,
                    conversation.created_at,
                ],
            )?;
            let conversation = tx.query_row(
                "SELECT id, request_id, student_id, instructor_id, created_at \
                 FROM conversations WHERE request_id = ?1",
                params![request_id],
                map_conversation_row,
            )?;
            tx.commit()?;
            Ok(Some(conversation))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist Expired for every New request past its expiry. Idempotent; safe
/// to re-run after a crash mid-sweep.
pub async fn sweep_expired(db: &Database, now_ts: &str) -> Result<u64, WheelhouseError> {
    let now_ts = now_ts.to_string();
    db.connection()
        .call(move |conn| {
            let updated = conn.execute(
                "UPDATE service_requests SET status = ?1 \
                 WHERE status = ?2 AND expires_at < ?3",
                params![
                    RequestStatus::Expired.to_string(),
                    RequestStatus::New.to_string(),
                    now_ts,
                ],
            )?;
            Ok(updated as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
