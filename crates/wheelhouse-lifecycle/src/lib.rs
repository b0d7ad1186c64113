// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request lifecycle state machine and permission matrix for the Wheelhouse
//! coordination engine.
//!
//! [`engine::LifecycleEngine`] owns every status change; [`permissions`]
//! holds the role matrix it consults.

pub mod engine;
pub mod permissions;

pub use engine::{LifecycleEngine, NewRequest, TransitionOutcome};
