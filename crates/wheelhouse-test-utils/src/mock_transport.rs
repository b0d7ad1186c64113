// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording message transport for deterministic testing.

use std::sync::Mutex;

use async_trait::async_trait;

use wheelhouse_core::types::MessageKind;
use wheelhouse_core::{MessageTransport, WheelhouseError};

/// A message as recorded by the mock transport.
#[derive(Debug, Clone)]
pub struct RecordedMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub kind: MessageKind,
    pub content: String,
}

/// Transport that records every persisted message in memory and can be
/// switched into a failing mode to exercise error paths.
#[derive(Default)]
pub struct MockMessageTransport {
    messages: Mutex<Vec<RecordedMessage>>,
    fail: Mutex<bool>,
}

impl MockMessageTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages persisted so far, in order.
    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Make subsequent `persist_message` calls fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl MessageTransport for MockMessageTransport {
    async fn persist_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<String, WheelhouseError> {
        if *self.fail.lock().unwrap() {
            return Err(WheelhouseError::Internal(
                "mock transport set to fail".into(),
            ));
        }
        let id = uuid::Uuid::new_v4().to_string();
        self.messages.lock().unwrap().push(RecordedMessage {
            id: id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            kind,
            content: content.to_string(),
        });
        Ok(id)
    }
}
