// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! These are the engine's only views of the surrounding product: the profile
//! store (roles, bans, verification), the subscription store (paid plans),
//! and the message transport (durable message persistence and delivery).
//! All use `#[async_trait]` for dynamic dispatch compatibility.

pub mod roles;
pub mod subscription;
pub mod transport;

pub use roles::RoleOracle;
pub use subscription::SubscriptionStore;
pub use transport::MessageTransport;
