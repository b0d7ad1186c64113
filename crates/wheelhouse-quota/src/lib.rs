// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Monthly chat quota metering for free-tier instructors.
//!
//! Exactly-once conversation charging with plan-bypass logic. See
//! [`meter::ChatQuota`].

pub mod meter;

pub use meter::{next_month_start, ChatQuota, QuotaDecision, UsageSummary};
