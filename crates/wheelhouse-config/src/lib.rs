// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Wheelhouse coordination engine.
//!
//! TOML files merged through Figment with `WHEELHOUSE_` environment variable
//! overrides. Models live in [`model`], loading functions in [`loader`].

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{QuotaConfig, RateLimitConfig, StorageConfig, WheelhouseConfig};
