// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for the Corvus platform.
//!
//! Layered TOML files with `CORVUS_` environment variable overrides,
//! merged with Figment. All sections default to sensible values so a
//! bare `corvus serve <service>` works against local backends.

pub mod loader;
pub mod model;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::CorvusConfig;
