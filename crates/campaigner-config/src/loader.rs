// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./campaigner.toml` > `~/.config/campaigner/campaigner.toml`
//! > `/etc/campaigner/campaigner.toml`, with environment variable overrides via
//! the `CAMPAIGNER_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CampaignerConfig;

pub(crate) const LOCAL_CONFIG: &str = "campaigner.toml";
pub(crate) const SYSTEM_CONFIG: &str = "/etc/campaigner/campaigner.toml";

/// Env var sections, longest first so `scheduler_email_` wins over a shorter match.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("scheduler_notification_", "scheduler.notification."),
    ("scheduler_mobile_", "scheduler.mobile."),
    ("scheduler_email_", "scheduler.email."),
    ("daemon_", "daemon."),
    ("storage_", "storage."),
    ("queue_", "queue."),
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("campaigner").join(LOCAL_CONFIG))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/campaigner/campaigner.toml` (system-wide)
/// 3. `~/.config/campaigner/campaigner.toml` (user XDG config)
/// 4. `./campaigner.toml` (local directory)
/// 5. `CAMPAIGNER_*` environment variables
pub fn load_config() -> Result<CampaignerConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<CampaignerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CampaignerConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for config loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CampaignerConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Map `CAMPAIGNER_<SECTION>_<KEY>` onto dotted figment keys.
///
/// Uses an explicit table rather than `Env::split("_")` because key names
/// themselves contain underscores (`CAMPAIGNER_QUEUE_SEND_TIMEOUT_SECS` is
/// `queue.send_timeout_secs`).
fn env_provider() -> Env {
    Env::prefixed("CAMPAIGNER_").map(|key| map_env_key(key.as_str()).into())
}

/// Figment hands the mapper the raw, upper-case remainder of the variable
/// name, so the key is lower-cased before the section lookup.
pub(crate) fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key
}
