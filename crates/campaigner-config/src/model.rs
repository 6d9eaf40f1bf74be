// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Campaigner dispatch engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level Campaigner configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignerConfig {
    /// Process-level settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Delivery queue settings.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Per-channel scheduler workers.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl CampaignerConfig {
    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Process-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long `serve` waits for workers to finish after a shutdown signal.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
        }
    }
}

impl DaemonConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_shutdown_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("campaigner").join("campaigner.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("campaigner.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Delivery queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Number of tasks the producer may hand off before it waits for the
    /// consumer. `1` is a single-slot handoff.
    #[serde(default = "default_queue_depth")]
    pub depth: usize,

    /// Abandon a transport call after this many seconds and record the
    /// message as failed. Unset means no timeout.
    #[serde(default)]
    pub send_timeout_secs: Option<u64>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            depth: default_queue_depth(),
            send_timeout_secs: None,
        }
    }
}

impl QueueConfig {
    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_secs.map(Duration::from_secs)
    }
}

fn default_queue_depth() -> usize {
    1
}

/// Scheduler workers, one per subscriber channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default = "WorkerConfig::enabled_default")]
    pub email: WorkerConfig,

    #[serde(default)]
    pub mobile: WorkerConfig,

    #[serde(default)]
    pub notification: WorkerConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            email: WorkerConfig::enabled_default(),
            mobile: WorkerConfig::default(),
            notification: WorkerConfig::default(),
        }
    }
}

/// One scheduler worker.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between dispatch runs.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
        }
    }
}

impl WorkerConfig {
    fn enabled_default() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_only_email() {
        let config = CampaignerConfig::default();
        assert!(config.scheduler.email.enabled);
        assert!(!config.scheduler.mobile.enabled);
        assert!(!config.scheduler.notification.enabled);
        assert_eq!(config.scheduler.email.interval(), Duration::from_secs(10));
    }

    #[test]
    fn queue_defaults_to_single_slot_without_timeout() {
        let queue = QueueConfig::default();
        assert_eq!(queue.depth, 1);
        assert_eq!(queue.send_timeout(), None);
    }

    #[test]
    fn default_database_path_ends_with_db_file() {
        let storage = StorageConfig::default();
        assert!(storage.database_path.ends_with("campaigner.db"));
        assert!(storage.wal_mode);
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let rendered = CampaignerConfig::default().to_toml_string().unwrap();
        assert!(rendered.contains("[daemon]"));
        assert!(rendered.contains("[scheduler.email]"));
        assert!(rendered.contains("interval_secs = 10"));
    }
}
