//! Conductor Executor
//!
//! Runs the steps of a confirmed `Plan` in list order. Each step's agent
//! configuration becomes one system/task prompt call to the model; the reply
//! is recorded as the step result. A failing step is marked `failed` and the
//! loop moves on, so one bad step never aborts the plan.

use crate::conductor::blocking_runtime;
use crate::conductor::types::{Plan, PlanStatus, Step};
use crate::llm::LLMProvider;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How steps are run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Call the model for every step
    #[default]
    Live,
    /// Return `stub_output` without calling the model
    Stub,
}

/// Executor settings, also the `[executor]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub mode: ExecutionMode,

    /// Result recorded for every step in stub mode
    #[serde(default = "default_stub_output")]
    pub stub_output: String,

    /// Used when a step's agent configuration has no system prompt
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::default(),
            stub_output: default_stub_output(),
            default_system_prompt: default_system_prompt(),
        }
    }
}

fn default_stub_output() -> String {
    "This is a test run of the agent with the provided configuration.".to_string()
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".to_string()
}

pub struct Executor {
    llm: Arc<dyn LLMProvider>,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(llm: Arc<dyn LLMProvider>, config: ExecutorConfig) -> Self {
        Self { llm, config }
    }

    /// Execute every step of `plan` and return it.
    ///
    /// Never fails: step errors are recorded on the step itself. The returned
    /// plan is `complete` even when some steps failed; use
    /// [`Plan::has_failures`] to tell the difference.
    pub async fn execute_plan(&self, mut plan: Plan) -> Plan {
        self.execute_plan_in_place(&mut plan).await;
        plan
    }

    /// Same as [`Executor::execute_plan`], mutating the caller's plan
    pub async fn execute_plan_in_place(&self, plan: &mut Plan) {
        info!(
            "Executing plan '{}' ({} steps, {:?} mode)",
            plan.title,
            plan.steps.len(),
            self.config.mode
        );
        let start = Instant::now();
        plan.status = PlanStatus::Executing;

        for step in plan.steps.iter_mut() {
            step.begin();
            info!("Executing step {}: {}", step.step_number, step.description);

            match self.execute_step(step).await {
                Ok(output) => {
                    debug!("Step {} produced {} chars", step.step_number, output.len());
                    step.complete(output);
                }
                Err(e) => {
                    let message = match e {
                        EngineError::StepExecution { message, .. } => message,
                        other => other.to_string(),
                    };
                    warn!("Step {} failed: {}", step.step_number, message);
                    step.fail(format!("Execution error: {}", message));
                }
            }
        }

        plan.status = PlanStatus::Complete;

        let failed = plan.failed_steps().count();
        info!(
            "Plan '{}' finished in {}ms ({} of {} steps failed)",
            plan.title,
            start.elapsed().as_millis(),
            failed,
            plan.steps.len()
        );
    }

    /// Blocking form of [`Executor::execute_plan`].
    ///
    /// Runs on a private current-thread runtime, so it must not be called
    /// from inside another Tokio runtime.
    pub fn execute_plan_blocking(&self, plan: Plan) -> Result<Plan, EngineError> {
        Ok(blocking_runtime()?.block_on(self.execute_plan(plan)))
    }

    /// Run a single step and return its output
    ///
    /// # Errors
    /// - `EngineError::MissingTaskPrompt` if the agent configuration has no
    ///   task prompt
    /// - `EngineError::StepExecution` if the model call fails
    pub async fn execute_step(&self, step: &Step) -> Result<String, EngineError> {
        let config = agent_config_map(step);

        let task_prompt = match config.get("task_prompt").and_then(Value::as_str) {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                return Err(EngineError::MissingTaskPrompt {
                    step_number: step.step_number,
                })
            }
        };
        let system_prompt = match config.get("system_prompt").and_then(Value::as_str) {
            Some(p) if !p.trim().is_empty() => p,
            _ => self.config.default_system_prompt.as_str(),
        };

        if self.config.mode == ExecutionMode::Stub {
            return Ok(self.config.stub_output.clone());
        }

        self.llm
            .invoke(system_prompt, task_prompt)
            .await
            .map_err(|e| EngineError::StepExecution {
                step_number: step.step_number,
                message: e.to_string(),
            })
    }
}

// Agent configuration as a plain key/value mapping
fn agent_config_map(step: &Step) -> Map<String, Value> {
    match serde_json::to_value(&step.agent_config) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conductor::types::{AgentConfig, StepStatus};
    use crate::llm::MockProvider;

    fn plan_with(steps: Vec<Step>) -> Plan {
        Plan {
            user_request: "Plan a product launch".to_string(),
            title: "Launch".to_string(),
            description: "Launch plan".to_string(),
            steps,
            status: PlanStatus::Planned,
        }
    }

    fn step(n: u32, task: &str) -> Step {
        Step::new(n, format!("step {}", n), AgentConfig::new("You are a worker", task))
    }

    #[tokio::test]
    async fn test_live_mode_records_replies() {
        let provider = Arc::new(
            MockProvider::new("unused")
                .with_reply("market report")
                .with_reply("press release"),
        );
        let executor = Executor::new(provider.clone(), ExecutorConfig::default());

        let plan = executor
            .execute_plan(plan_with(vec![step(1, "research"), step(2, "write")]))
            .await;

        assert_eq!(plan.status, PlanStatus::Complete);
        assert_eq!(plan.steps[0].result.as_deref(), Some("market report"));
        assert_eq!(plan.steps[1].result.as_deref(), Some("press release"));
        assert!(plan.steps.iter().all(|s| s.status == StepStatus::Completed));

        let calls = provider.calls();
        assert_eq!(calls[0][0].content, "You are a worker");
        assert_eq!(calls[0][1].content, "research");
        assert_eq!(calls[1][1].content, "write");
    }

    #[tokio::test]
    async fn test_failed_step_does_not_stop_plan() {
        let provider = Arc::new(
            MockProvider::new("ok")
                .with_reply("first")
                .with_failure("connection reset"),
        );
        let executor = Executor::new(provider, ExecutorConfig::default());

        let plan = executor
            .execute_plan(plan_with(vec![step(1, "a"), step(2, "b"), step(3, "c")]))
            .await;

        assert_eq!(plan.status, PlanStatus::Complete);
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
        assert_eq!(plan.steps[1].status, StepStatus::Failed);
        assert_eq!(
            plan.steps[1].result.as_deref(),
            Some("Execution error: Provider unavailable: connection reset")
        );
        assert_eq!(plan.steps[2].status, StepStatus::Completed);
        assert_eq!(plan.steps[2].result.as_deref(), Some("ok"));
        assert!(plan.has_failures());
    }

    #[tokio::test]
    async fn test_missing_task_prompt_fails_step_in_both_modes() {
        for mode in [ExecutionMode::Live, ExecutionMode::Stub] {
            let provider = Arc::new(MockProvider::new("reply"));
            let config = ExecutorConfig {
                mode,
                ..ExecutorConfig::default()
            };
            let executor = Executor::new(provider.clone(), config);

            let plan = executor
                .execute_plan(plan_with(vec![step(1, "  "), step(2, "real work")]))
                .await;

            assert_eq!(plan.steps[0].status, StepStatus::Failed);
            let result = plan.steps[0].result.as_deref().unwrap();
            assert!(result.starts_with("Execution error: task_prompt must be provided"));
            assert!(result.ends_with("(step 1)"));
            assert_eq!(plan.steps[1].status, StepStatus::Completed);
            if mode == ExecutionMode::Live {
                assert_eq!(provider.call_count(), 1);
            }
        }
    }

    #[tokio::test]
    async fn test_blank_system_prompt_uses_default() {
        let provider = Arc::new(MockProvider::new("done"));
        let executor = Executor::new(provider.clone(), ExecutorConfig::default());

        let s = Step::new(1, "d", AgentConfig::new("", "do it"));
        executor.execute_plan(plan_with(vec![s])).await;

        let calls = provider.calls();
        assert_eq!(calls[0][0].content, "You are a helpful assistant.");
    }

    #[tokio::test]
    async fn test_stub_mode_never_calls_model() {
        let provider = Arc::new(MockProvider::new("live reply"));
        let config = ExecutorConfig {
            mode: ExecutionMode::Stub,
            ..ExecutorConfig::default()
        };
        let executor = Executor::new(provider.clone(), config);

        let plan = executor
            .execute_plan(plan_with(vec![step(1, "a"), step(2, "b")]))
            .await;

        for s in &plan.steps {
            assert_eq!(s.status, StepStatus::Completed);
            assert_eq!(
                s.result.as_deref(),
                Some("This is a test run of the agent with the provided configuration.")
            );
        }
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rerun_resets_previous_results() {
        let provider = Arc::new(MockProvider::new("second run").with_failure("boom"));
        let executor = Executor::new(provider, ExecutorConfig::default());

        let mut plan = plan_with(vec![step(1, "a")]);
        executor.execute_plan_in_place(&mut plan).await;
        assert_eq!(plan.steps[0].status, StepStatus::Failed);

        executor.execute_plan_in_place(&mut plan).await;
        assert_eq!(plan.steps[0].status, StepStatus::Completed);
        assert_eq!(plan.steps[0].result.as_deref(), Some("second run"));
    }

    #[test]
    fn test_execute_plan_blocking() {
        let provider = Arc::new(MockProvider::new("x"));
        let executor = Executor::new(provider, ExecutorConfig::default());
        let plan = executor
            .execute_plan_blocking(plan_with(vec![step(1, "a")]))
            .unwrap();
        assert_eq!(plan.status, PlanStatus::Complete);
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: ExecutorConfig = toml::from_str("").unwrap();
        assert_eq!(config.mode, ExecutionMode::Live);
        assert_eq!(config.default_system_prompt, "You are a helpful assistant.");
    }
}
