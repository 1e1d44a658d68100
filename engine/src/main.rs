// Foreman task planner
// Main entry point for the foreman binary

use std::sync::Arc;

use clap::Parser;
use foreman_engine::cli::{Cli, Command};
use foreman_engine::conductor::{Executor, Planner, PlannerConfig};
use foreman_engine::config::Config;
use foreman_engine::console::Console;
use foreman_engine::handlers::{
    build_provider, handle_plan, handle_run, handle_status, with_hint, OutputFormat,
};
use foreman_engine::secrets::SecretManager;
use foreman_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path).map_err(with_hint)?
    } else {
        Config::load_or_create().map_err(with_hint)?
    };

    // --log wins over the config file; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("Foreman v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Plan { request } => {
            tracing::info!("Planning: {}", request);
            handle_plan(request, &config, format).await
        }

        Command::Run { request, yes, stub } => {
            tracing::info!("Running: {}", request);
            handle_run(request, yes, stub, &config, format).await
        }

        Command::Status => handle_status(&config, format).await,

        Command::Console => {
            let secrets = SecretManager::from_env();
            let llm = build_provider(&config, &secrets).map_err(with_hint)?;
            let planner = Planner::new(Arc::clone(&llm), PlannerConfig::default());
            let executor = Executor::new(llm, config.executor.clone());

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            Console::new(planner, executor)
                .run(stdin, std::io::stdout())
                .await
        }
    }
}
