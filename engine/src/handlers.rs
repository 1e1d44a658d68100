//! Command handlers for CLI operations
//!
//! This module implements the handlers for the CLI commands:
//! - plan: generate and print a plan
//! - run: generate, confirm and execute a plan
//! - status: show the active provider and executor settings
//!
//! It also owns provider construction and the plan/report renderers shared
//! with the interactive console.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use crate::conductor::{
    ExecutionMode, Executor, Plan, Planner, PlannerConfig, StepStatus, PLANNER_SYSTEM_PROMPT,
};
use crate::config::Config;
use crate::llm::{LLMProvider, MockProvider, OpenAICompatibleProvider};
use crate::secrets::SecretManager;
use sdk::errors::{EngineError, ForemanErrorExt};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Plan returned by the offline `mock` provider
const MOCK_PLAN: &str = r#"{
  "user_request": "",
  "title": "Offline Plan",
  "description": "Two-step plan produced by the mock provider",
  "steps": [
    {
      "step_number": 1,
      "description": "Gather the information the request needs",
      "agent_config": {
        "system_prompt": "You are a meticulous research assistant.",
        "task_prompt": "List the facts and open questions relevant to the request."
      },
      "dependencies": [],
      "status": "pending",
      "result": ""
    },
    {
      "step_number": 2,
      "description": "Produce the deliverable",
      "agent_config": {
        "system_prompt": "You are a clear and concise writer.",
        "task_prompt": "Write the final deliverable using the gathered information."
      },
      "dependencies": [1],
      "status": "pending",
      "result": ""
    }
  ],
  "status": "awaiting_confirmation"
}"#;

const MOCK_STEP_REPLY: &str = "Mock response for offline runs.";

/// Build the provider selected by `llm.provider`
///
/// # Errors
/// Returns `EngineError::Config` if the provider's API key is not set
pub fn build_provider(
    config: &Config,
    secrets: &SecretManager,
) -> Result<Arc<dyn LLMProvider>, EngineError> {
    let Some(endpoint) = config.llm.active_provider() else {
        tracing::info!("Using offline mock provider");
        return Ok(Arc::new(
            MockProvider::new(MOCK_STEP_REPLY).with_system_reply(PLANNER_SYSTEM_PROMPT, MOCK_PLAN),
        ));
    };

    let api_key = secrets.get_secret(&endpoint.api_key_env)?;
    let provider = OpenAICompatibleProvider::new(
        config.llm.provider.clone(),
        endpoint,
        api_key,
        config.llm.timeout(),
    )?;

    tracing::info!(
        "Using provider {} with model {}",
        provider.name(),
        provider.model()
    );
    Ok(Arc::new(provider))
}

fn build_conductor(config: &Config) -> Result<(Planner, Executor)> {
    let secrets = SecretManager::from_env();
    let llm = build_provider(config, &secrets).map_err(with_hint)?;

    let planner = Planner::new(Arc::clone(&llm), PlannerConfig::default());
    let executor = Executor::new(llm, config.executor.clone());
    Ok((planner, executor))
}

/// Attach the user-facing hint to an engine error
pub fn with_hint(e: EngineError) -> anyhow::Error {
    let hint = e.user_hint().to_string();
    anyhow::Error::new(e).context(hint)
}

/// Generate and print a plan
pub async fn handle_plan(request: String, config: &Config, format: OutputFormat) -> Result<()> {
    let (planner, _) = build_conductor(config)?;
    let plan = planner.generate_plan(&request).await.map_err(with_hint)?;

    match format {
        OutputFormat::Text => print!("{}", render_plan(&plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

/// Generate a plan, confirm it, and execute it
pub async fn handle_run(
    request: String,
    assume_yes: bool,
    stub: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let mut config = config.clone();
    if stub {
        config.executor.mode = ExecutionMode::Stub;
    }

    let (planner, executor) = build_conductor(&config)?;
    let mut plan = planner.generate_plan(&request).await.map_err(with_hint)?;

    if let OutputFormat::Text = format {
        print!("{}", render_plan(&plan));
        println!();
    }

    if !assume_yes && !confirm("Execute this plan?")? {
        match format {
            OutputFormat::Text => println!("Plan not executed."),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        }
        return Ok(());
    }

    plan.confirm();
    executor.execute_plan_in_place(&mut plan).await;

    match format {
        OutputFormat::Text => print!("{}", render_report(&plan)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
    }
    Ok(())
}

/// Snapshot printed by `foreman status`
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>,
    pub api_key_present: bool,
    /// Result of the provider's health check; false if it could not be built
    pub provider_healthy: bool,
    pub executor_mode: ExecutionMode,
    pub timeout_secs: u64,
}

/// Gather settings and check the configured provider is reachable
pub async fn collect_status(config: &Config, secrets: &SecretManager) -> StatusReport {
    let endpoint = config.llm.active_provider();
    let api_key_env = endpoint.map(|p| p.api_key_env.clone());
    let api_key_present = api_key_env
        .as_deref()
        .map(|k| secrets.has_secret(k))
        .unwrap_or(true);

    let provider_healthy = match build_provider(config, secrets) {
        Ok(llm) => llm.check_health().await,
        Err(e) => {
            tracing::debug!("Provider not constructed: {}", e);
            false
        }
    };

    StatusReport {
        provider: config.llm.provider.clone(),
        model: endpoint
            .map(|p| p.model.clone())
            .unwrap_or_else(|| "mock".to_string()),
        base_url: endpoint.map(|p| p.base_url.clone()),
        api_key_env,
        api_key_present,
        provider_healthy,
        executor_mode: config.executor.mode,
        timeout_secs: config.llm.timeout_secs,
    }
}

/// Show provider, model and executor settings
pub async fn handle_status(config: &Config, format: OutputFormat) -> Result<()> {
    let secrets = SecretManager::from_env();
    let report = collect_status(config, &secrets).await;

    match format {
        OutputFormat::Text => {
            println!("Foreman Status");
            println!("==============");
            println!("  {:<16} {}", "Provider:", report.provider);
            println!("  {:<16} {}", "Model:", report.model);
            if let Some(base_url) = &report.base_url {
                println!("  {:<16} {}", "Endpoint:", base_url);
            }
            if let Some(key_env) = &report.api_key_env {
                let state = if report.api_key_present {
                    "is set"
                } else {
                    "is NOT set"
                };
                println!("  {:<16} {} {}", "API key:", key_env, state);
            }
            println!(
                "  {:<16} {}",
                "Health:",
                if report.provider_healthy {
                    "available"
                } else {
                    "unavailable"
                }
            );
            let mode = match report.executor_mode {
                ExecutionMode::Live => "live",
                ExecutionMode::Stub => "stub",
            };
            println!("  {:<16} {}", "Executor mode:", mode);
            println!("  {:<16} {}s", "Timeout:", report.timeout_secs);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Ask a yes/no question on stderr and read the answer from stdin
fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Human-readable rendering of a plan before execution
pub fn render_plan(plan: &Plan) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Plan: {}", plan.title);
    let _ = writeln!(out, "  {}", plan.description);
    let _ = writeln!(out, "  Request: {}", plan.user_request);
    let _ = writeln!(out, "  Status:  {}", plan.status);
    let _ = writeln!(out);

    for step in &plan.steps {
        let _ = writeln!(out, "  {}. {}", step.step_number, step.description);
        let _ = writeln!(out, "     system: {}", step.agent_config.system_prompt);
        let _ = writeln!(out, "     task:   {}", step.agent_config.task_prompt);
        if !step.dependencies.is_empty() {
            let deps: Vec<String> = step.dependencies.iter().map(|d| d.to_string()).collect();
            let _ = writeln!(out, "     after:  {}", deps.join(", "));
        }
        if let Some(feedback) = &step.feedback {
            let _ = writeln!(out, "     feedback: {}", feedback);
        }
    }
    out
}

/// Per-step report after execution
pub fn render_report(plan: &Plan) -> String {
    let mut out = String::new();
    let failed = plan.failed_steps().count();

    if failed == 0 {
        let _ = writeln!(out, "Plan '{}': {}", plan.title, plan.status);
    } else {
        let _ = writeln!(
            out,
            "Plan '{}': {} ({} of {} steps failed)",
            plan.title,
            plan.status,
            failed,
            plan.steps.len()
        );
    }
    let _ = writeln!(out);

    for step in &plan.steps {
        let marker = match step.status {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Pending | StepStatus::InProgress => "·",
        };
        let _ = writeln!(
            out,
            "{} Step {}: {} [{}]",
            marker, step.step_number, step.description, step.status
        );
        if let Some(result) = &step.result {
            for line in result.lines() {
                let _ = writeln!(out, "    {}", line);
            }
        }
        let _ = writeln!(out);
    }
    out
}
