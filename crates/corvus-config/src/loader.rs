// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports `./corvus.toml` > `~/.config/corvus/corvus.toml` >
//! `/etc/corvus/corvus.toml` with environment variable overrides via the
//! `CORVUS_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CorvusConfig;

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/corvus/corvus.toml` (system-wide)
/// 3. `~/.config/corvus/corvus.toml` (user XDG config)
/// 4. `./corvus.toml` (local directory)
/// 5. `CORVUS_*` environment variables
pub fn load_config() -> Result<CorvusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CorvusConfig::default()))
        .merge(Toml::file("/etc/corvus/corvus.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("corvus/corvus.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("corvus.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from inline TOML only (tests and tooling).
pub fn load_config_from_str(toml_content: &str) -> Result<CorvusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CorvusConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CorvusConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CorvusConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

const SECTIONS: &[&str] = &[
    "log", "bus", "redis", "auth", "vector", "model", "index", "chat", "gateway",
];

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CORVUS_AUTH_JWT_SECRET` must map to
/// `auth.jwt_secret`, not `auth.jwt.secret`. Only the leading section
/// name becomes a dot; `CORVUS_REDIS_CHAT_TTL_SECS` stays
/// `redis.chat_ttl_secs`.
fn env_provider() -> Env {
    Env::prefixed("CORVUS_").map(|key| {
        let key_str = key.as_str();
        for section in SECTIONS {
            if let Some(rest) = key_str.strip_prefix(&format!("{section}_")) {
                return format!("{section}.{rest}").into();
            }
        }
        key_str.to_string().into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_any_file() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.bus.url, "nats://127.0.0.1:4222");
        assert_eq!(config.bus.request_timeout_secs, 5);
        assert_eq!(config.auth.access_ttl_secs, 900);
        assert_eq!(config.index.chunk_size, 700);
        assert_eq!(config.index.chunk_overlap, 80);
        assert_eq!(config.index.max_chunks, 0);
        assert_eq!(config.vector.dimension, 768);
        assert_eq!(config.gateway.rps, 50);
    }

    #[test]
    fn toml_overrides_defaults() {
        let toml = r#"
            [bus]
            url = "nats://bus.internal:4222"

            [index]
            chunk_size = 256
            chunk_overlap = 32

            [auth]
            jwt_secret = "test-secret"
        "#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.bus.url, "nats://bus.internal:4222");
        assert_eq!(config.index.chunk_size, 256);
        assert_eq!(config.index.chunk_overlap, 32);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("test-secret"));
        // Untouched sections keep their defaults.
        assert_eq!(config.vector.collection, "documents");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml = r#"
            [bus]
            uri = "nats://typo:4222"
        "#;
        let result = load_config_from_str(toml);
        assert!(result.is_err(), "unknown key 'uri' should fail extraction");
    }

    #[test]
    fn metadata_headers_default_to_request_and_user_id() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(
            config.bus.metadata_headers,
            vec!["X-Request-Id".to_string(), "X-User-Id".to_string()]
        );
    }
}
