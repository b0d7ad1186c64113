// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message transport collaborator.

use async_trait::async_trait;

use crate::error::WheelhouseError;
use crate::types::MessageKind;

/// Persists messages durably and fans them out to recipients.
///
/// The engine only gates and meters messaging; storage and delivery are this
/// collaborator's problem. `persist_message` must return a durable message id.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn persist_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<String, WheelhouseError>;
}
