// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only audit ledger for the Wheelhouse coordination engine.
//!
//! History for operators, and the sliding-window data source for the rate
//! limiter. See [`ledger::AuditLedger`].

pub mod ledger;

pub use ledger::AuditLedger;
