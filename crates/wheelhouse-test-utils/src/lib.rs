// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Wheelhouse integration tests: in-memory mock
//! collaborators and a database harness.

pub mod harness;
pub mod mock_roles;
pub mod mock_subscriptions;
pub mod mock_transport;

pub use harness::{in_memory_database, test_database};
pub use mock_roles::MockRoleOracle;
pub use mock_subscriptions::MockSubscriptionStore;
pub use mock_transport::{MockMessageTransport, RecordedMessage};
