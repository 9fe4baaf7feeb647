// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tessera.toml` > `~/.config/tessera/tessera.toml` >
//! `/etc/tessera/tessera.toml` with environment variable overrides via `TESSERA_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::TesseraConfig;

/// Top-level sections, used to turn `TESSERA_<SECTION>_<KEY>` into `section.key`.
const SECTIONS: &[&str] = &[
    "engine",
    "embedding",
    "extraction",
    "contradiction",
    "storage",
    "graph",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tessera/tessera.toml`
/// 3. `~/.config/tessera/tessera.toml`
/// 4. `./tessera.toml`
/// 5. `TESSERA_*` environment variables
pub fn load_config() -> Result<TesseraConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<TesseraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TesseraConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TesseraConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TesseraConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TesseraConfig::default()))
        .merge(Toml::file("/etc/tessera/tessera.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("tessera/tessera.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("tessera.toml"))
        .merge(env_provider())
}

/// Map an env key (prefix stripped, lowercased) to its dotted config path.
///
/// Only the section separator becomes a dot: `embedding_api_key` maps to
/// `embedding.api_key`, never `embedding.api.key`.
pub fn env_key_to_path(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("TESSERA_").map(|key| env_key_to_path(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(env_key_to_path("embedding_api_key"), "embedding.api_key");
        assert_eq!(env_key_to_path("engine_top_k"), "engine.top_k");
        assert_eq!(
            env_key_to_path("engine_similarity_threshold"),
            "engine.similarity_threshold"
        );
        assert_eq!(env_key_to_path("graph_database_path"), "graph.database_path");
        assert_eq!(env_key_to_path("unknown"), "unknown");
    }
}
