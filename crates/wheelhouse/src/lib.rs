// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wheelhouse — marketplace coordination engine.
//!
//! Coordinates students and driving instructors around service requests: a
//! request lifecycle state machine with a role-based permission matrix, a
//! free-tier chat quota with exactly-once conversation charging, an
//! append-only audit ledger, and sliding-window rate limits derived from
//! that ledger.
//!
//! The engine owns its SQLite state and talks to the surrounding product
//! through three traits: [`RoleOracle`] (roles, verification, bans),
//! [`SubscriptionStore`] (paid plans) and [`MessageTransport`] (message
//! persistence and delivery).
//!
//! ```no_run
//! # use std::sync::Arc;
//! # async fn demo(
//! #     roles: Arc<dyn wheelhouse::RoleOracle>,
//! #     subs: Arc<dyn wheelhouse::SubscriptionStore>,
//! #     transport: Arc<dyn wheelhouse::MessageTransport>,
//! # ) -> Result<(), wheelhouse::WheelhouseError> {
//! use chrono::Utc;
//! use wheelhouse::{Engine, NewRequest, WheelhouseConfig};
//!
//! let engine = Engine::open(WheelhouseConfig::default(), roles, subs, transport).await?;
//! let request = engine
//!     .create_request(
//!         "stu-1",
//!         NewRequest {
//!             category: "category-b".into(),
//!             city: "Riga".into(),
//!             budget: Some(45_00),
//!         },
//!         Utc::now(),
//!     )
//!     .await?;
//! let outcome = engine
//!     .respond_to_request(&request.id, "ins-1", "Hi! I teach in your area.", None, Utc::now())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod engine;

pub use engine::Engine;

pub use wheelhouse_config::{
    load_config, load_config_from_path, load_config_from_str, QuotaConfig, RateLimitConfig,
    StorageConfig, WheelhouseConfig,
};
pub use wheelhouse_core::types::{
    ActionKind, AuditLogEntry, BanStatus, Conversation, MessageKind, RequestStatus, Role,
    ServiceRequest, Subscription,
};
pub use wheelhouse_core::{MessageTransport, RoleOracle, SubscriptionStore, WheelhouseError};
pub use wheelhouse_lifecycle::{NewRequest, TransitionOutcome};
pub use wheelhouse_quota::{QuotaDecision, UsageSummary};
pub use wheelhouse_ratelimit::{RateBucket, RateDecision};
pub use wheelhouse_storage::Database;
