// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Wheelhouse marketplace coordination engine.
//!
//! This crate provides the error type, domain types, and collaborator trait
//! definitions used throughout the Wheelhouse workspace. Everything with
//! business logic lives in the component crates; this one only defines the
//! shared vocabulary.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::WheelhouseError;
pub use traits::{MessageTransport, RoleOracle, SubscriptionStore};
pub use types::{
    ActionKind, AuditLogEntry, BanStatus, Conversation, ConversationUsageLog, MessageKind,
    MonthlyChatUsage, RequestStatus, Role, ServiceRequest, Subscription,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_taxonomy_is_complete() {
        // All caller-facing variants exist and can be constructed.
        let _ = WheelhouseError::NotFound {
            resource: "request",
            id: "r".into(),
        };
        let _ = WheelhouseError::InvalidTransition {
            from: RequestStatus::New,
            to: RequestStatus::Agreed,
        };
        let _ = WheelhouseError::Forbidden("students may only cancel".into());
        let _ = WheelhouseError::Conflict("status moved".into());
        let _ = WheelhouseError::QuotaExceeded { used: 7, limit: 7 };
        let _ = WheelhouseError::RateLimited {
            bucket: "CreateRequest".into(),
            limit: 5,
            window_secs: 3600,
        };
    }

    #[test]
    fn trait_objects_are_usable() {
        fn _assert_oracle(_: &dyn RoleOracle) {}
        fn _assert_subscriptions(_: &dyn SubscriptionStore) {}
        fn _assert_transport(_: &dyn MessageTransport) {}
    }
}
