// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lookups. Creation happens inside the Responded claim
//! transaction (see `queries::requests::claim_for_response`); conversations
//! are never created any other way.

use rusqlite::params;

use wheelhouse_core::WheelhouseError;

use crate::database::Database;
use crate::models::Conversation;
use crate::queries::requests::map_conversation_row;

const CONVERSATION_COLUMNS: &str = "id, request_id, student_id, instructor_id, created_at";

/// Get a conversation by ID.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, WheelhouseError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], map_conversation_row);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the conversation scoped to a request, if an instructor has responded.
pub async fn get_by_request(
    db: &Database,
    request_id: &str,
) -> Result<Option<Conversation>, WheelhouseError> {
    let request_id = request_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE request_id = ?1"
            ))?;
            let result = stmt.query_row(params![request_id], map_conversation_row);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
