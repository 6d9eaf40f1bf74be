// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde attributes cannot express: non-zero intervals,
//! a non-empty database path, and which channels actually have a dispatcher.

use crate::diagnostic::ConfigError;
use crate::model::{CampaignerConfig, WorkerConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &CampaignerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.daemon.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "daemon.log_level `{}` is not one of {}",
            config.daemon.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.queue.depth < 1 {
        errors.push(ConfigError::validation(format!(
            "queue.depth must be at least 1, got {}",
            config.queue.depth
        )));
    }

    if config.queue.send_timeout_secs == Some(0) {
        errors.push(ConfigError::validation(
            "queue.send_timeout_secs must be at least 1 when set",
        ));
    }

    let workers: [(&str, &WorkerConfig); 3] = [
        ("email", &config.scheduler.email),
        ("mobile", &config.scheduler.mobile),
        ("notification", &config.scheduler.notification),
    ];
    for (name, worker) in workers {
        if worker.interval_secs < 1 {
            errors.push(ConfigError::validation(format!(
                "scheduler.{name}.interval_secs must be at least 1, got {}",
                worker.interval_secs
            )));
        }
    }

    for (name, worker) in &workers[1..] {
        if worker.enabled {
            errors.push(ConfigError::validation(format!(
                "scheduler.{name}.enabled: no dispatcher exists for {name} subscribers"
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
