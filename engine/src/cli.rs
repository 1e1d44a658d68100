//! CLI interface for Foreman
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Foreman task planner
///
/// Breaks a request into a plan of agent steps with a language model, lets
/// you review it, then runs every step and reports the results.
#[derive(Parser, Debug)]
#[command(name = "foreman")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a plan for a request and print it
    Plan {
        /// What you want done
        request: String,
    },

    /// Generate a plan, confirm it, and execute every step
    Run {
        /// What you want done
        request: String,

        /// Execute without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Record placeholder results instead of calling the model for steps
        #[arg(long)]
        stub: bool,
    },

    /// Show provider, model and executor settings
    Status,

    /// Interactive session for planning, revising and executing plans
    Console,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_flags() {
        let cli = Cli::parse_from([
            "foreman",
            "--json",
            "run",
            "Plan a product launch",
            "--yes",
            "--stub",
        ]);
        assert!(cli.json);
        match cli.command {
            Command::Run { request, yes, stub } => {
                assert_eq!(request, "Plan a product launch");
                assert!(yes);
                assert!(stub);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "foreman", "status", "--log", "debug", "--config", "/tmp/f.toml",
        ]);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/f.toml")));
        assert!(matches!(cli.command, Command::Status));
    }

    #[test]
    fn test_unknown_log_level_rejected() {
        assert!(Cli::try_parse_from(["foreman", "--log", "loud", "status"]).is_err());
    }

    #[test]
    fn test_plan_requires_request() {
        assert!(Cli::try_parse_from(["foreman", "plan"]).is_err());
    }
}
