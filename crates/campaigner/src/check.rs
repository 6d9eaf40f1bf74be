// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `campaigner check-config` command implementation.
//!
//! Configuration has already been validated by the time this runs; the
//! remaining checks open the database and make sure every stored email
//! service resolves to a registered transport with a parseable payload.

use std::io::IsTerminal;
use std::time::{Duration, Instant};

use campaigner_config::CampaignerConfig;
use campaigner_core::CampaignerError;
use campaigner_storage::Database;
use campaigner_storage::queries::services;
use campaigner_transport::TransportRegistry;

/// Status of a check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `campaigner check-config` command.
///
/// Returns an error if any check failed, so the process exits non-zero.
pub async fn run_check(config: &CampaignerConfig, plain: bool) -> Result<(), CampaignerError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = vec![check_workers(config)];

    let start = Instant::now();
    match Database::open_with(&config.storage.database_path, config.storage.wal_mode).await {
        Ok(db) => {
            results.push(CheckResult::new(
                "Database",
                CheckStatus::Pass,
                format!("opened {}", config.storage.database_path),
                start,
            ));
            results.push(check_services(&db, &TransportRegistry::with_builtin()).await);
            db.close().await?;
        }
        Err(e) => results.push(CheckResult::new(
            "Database",
            CheckStatus::Fail,
            format!("open failed: {e}"),
            start,
        )),
    }

    println!();
    println!("  campaigner check-config");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    for result in &results {
        if result.status == CheckStatus::Fail {
            fail_count += 1;
        }
        println!("{}", render_line(result, use_color));
    }
    println!();

    if fail_count > 0 {
        let word = if fail_count == 1 { "check" } else { "checks" };
        println!("  {fail_count} {word} failed.");
        println!();
        return Err(CampaignerError::Config(format!("{fail_count} {word} failed")));
    }
    println!("  All checks passed.");
    println!();
    Ok(())
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal().to_string()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow().to_string()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red().to_string()),
        };
        format!("    {symbol} {:<20} {message} ({duration_ms}ms)", result.name)
    } else {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!("    {tag} {:<20} {} ({duration_ms}ms)", result.name, result.message)
    }
}

fn check_workers(config: &CampaignerConfig) -> CheckResult {
    let start = Instant::now();
    let workers = &config.scheduler;
    if workers.email.enabled {
        CheckResult::new(
            "Scheduler",
            CheckStatus::Pass,
            format!("email every {}s", workers.email.interval_secs),
            start,
        )
    } else {
        CheckResult::new("Scheduler", CheckStatus::Warn, "no workers enabled", start)
    }
}

/// Every stored service must name a registered transport whose payload parses.
async fn check_services(db: &Database, registry: &TransportRegistry) -> CheckResult {
    let start = Instant::now();
    let stored = match services::list_services(db).await {
        Ok(stored) => stored,
        Err(e) => {
            return CheckResult::new("Email services", CheckStatus::Fail, e.to_string(), start);
        }
    };
    if stored.is_empty() {
        return CheckResult::new(
            "Email services",
            CheckStatus::Warn,
            "none configured",
            start,
        );
    }

    let broken: Vec<String> = stored
        .iter()
        .filter_map(|service| {
            registry
                .resolve(&service.service_type, &service.payload)
                .err()
                .map(|e| format!("{} ({e})", service.name))
        })
        .collect();
    if broken.is_empty() {
        CheckResult::new(
            "Email services",
            CheckStatus::Pass,
            format!("{} ok", stored.len()),
            start,
        )
    } else {
        CheckResult::new("Email services", CheckStatus::Fail, broken.join("; "), start)
    }
}
