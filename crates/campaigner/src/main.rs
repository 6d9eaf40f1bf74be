// SPDX-FileCopyrightText: 2026 Campaigner Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaigner - scheduled email campaign dispatch.
//!
//! This is the binary entry point for the Campaigner daemon.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod check;
mod serve;

use std::path::PathBuf;

use campaigner_config::CampaignerConfig;
use clap::{Parser, Subcommand};

/// Campaigner - scheduled email campaign dispatch.
#[derive(Parser, Debug)]
#[command(name = "campaigner", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler workers until SIGINT/SIGTERM.
    Serve,
    /// Run a single dispatch step and print its outcome.
    Dispatch,
    /// Validate configuration, storage and stored email services.
    CheckConfig {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> CampaignerConfig {
    let loaded = match path {
        Some(path) => campaigner_config::load_and_validate_path(path),
        None => campaigner_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            campaigner_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Dispatch) => match serve::run_dispatch(config).await {
            Ok(outcome) => {
                match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => println!("{json}"),
                    Err(_) => println!("{outcome:?}"),
                }
                Ok(())
            }
            Err(e) => Err(e),
        },
        Some(Commands::CheckConfig { plain }) => check::run_check(&config, plain).await,
        None => {
            println!("campaigner: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn cli_parses_subcommands_and_global_config() {
        let cli = Cli::try_parse_from(["campaigner", "dispatch", "--config", "/tmp/c.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Dispatch)));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));

        let cli = Cli::try_parse_from(["campaigner", "check-config", "--plain"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::CheckConfig { plain: true })));
    }

    #[test]
    fn defaults_are_valid() {
        let config = campaigner_config::load_and_validate_str("").unwrap();
        assert!(config.scheduler.email.enabled);
        assert_eq!(config.queue.depth, 1);
    }
}
