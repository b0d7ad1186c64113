// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `wheelhouse-core::types` for use across
//! component boundaries. This module re-exports them for convenience within
//! the storage crate.

pub use wheelhouse_core::types::{
    AuditLogEntry, Conversation, ConversationUsageLog, MonthlyChatUsage, ServiceRequest,
};
