//! Plan and step data model
//!
//! These types double as the wire contract with the planning model: field
//! names and status strings must stay exactly as serialized here.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// System/task prompt pair defining one model invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Prompt that sets the behavior of the agent
    pub system_prompt: String,

    /// Specific instruction for the task
    pub task_prompt: String,
}

impl AgentConfig {
    pub fn new(system_prompt: impl Into<String>, task_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            task_prompt: task_prompt.into(),
        }
    }
}

/// Lifecycle of a single step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub const ALL: [&'static str; 4] = ["pending", "in_progress", "completed", "failed"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a whole plan
///
/// `Complete` only means every step was attempted. Per-step outcomes live on
/// the steps themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    AwaitingConfirmation,
    Planned,
    Executing,
    Complete,
}

impl PlanStatus {
    pub const ALL: [&'static str; 4] =
        ["awaiting_confirmation", "planned", "executing", "complete"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Planned => "planned",
            Self::Executing => "executing",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of work with its own agent configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Number assigned by the model; not checked for uniqueness
    pub step_number: u32,

    pub description: String,

    /// Configuration for the agent executing this step
    pub agent_config: AgentConfig,

    /// Step numbers this step claims to depend on. Carried, never enforced:
    /// execution order is the order of `Plan::steps`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub dependencies: Vec<u32>,

    #[serde(default)]
    pub status: StepStatus,

    /// Agent output on success, error description on failure
    #[serde(default, deserialize_with = "empty_as_none")]
    pub result: Option<String>,

    /// Human feedback on the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Step {
    pub fn new(
        step_number: u32,
        description: impl Into<String>,
        agent_config: AgentConfig,
    ) -> Self {
        Self {
            step_number,
            description: description.into(),
            agent_config,
            dependencies: Vec::new(),
            status: StepStatus::Pending,
            result: None,
            feedback: None,
        }
    }

    /// Mark the step as running. Any result from a previous run is dropped.
    pub fn begin(&mut self) {
        self.status = StepStatus::InProgress;
        self.result = None;
    }

    pub fn complete(&mut self, output: impl Into<String>) {
        self.status = StepStatus::Completed;
        self.result = Some(output.into());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.result = Some(message.into());
    }
}

/// Ordered collection of steps produced from a user request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub user_request: String,

    pub title: String,

    /// Brief description of what the plan accomplishes
    pub description: String,

    /// Steps in execution order
    pub steps: Vec<Step>,

    #[serde(default)]
    pub status: PlanStatus,
}

impl Plan {
    /// Accept a freshly generated plan for execution
    pub fn confirm(&mut self) {
        if self.status == PlanStatus::AwaitingConfirmation {
            self.status = PlanStatus::Planned;
        }
    }

    /// Put the plan back in front of the user: every step pending with no
    /// result, plan awaiting confirmation.
    pub fn reset_for_review(&mut self) {
        for step in &mut self.steps {
            step.status = StepStatus::Pending;
            step.result = None;
        }
        self.status = PlanStatus::AwaitingConfirmation;
    }

    pub fn step_mut(&mut self, step_number: u32) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.step_number == step_number)
    }

    /// Attach human feedback to a step. Returns false if no such step exists.
    pub fn set_feedback(&mut self, step_number: u32, feedback: impl Into<String>) -> bool {
        match self.step_mut(step_number) {
            Some(step) => {
                step.feedback = Some(feedback.into());
                true
            }
            None => false,
        }
    }

    pub fn completed_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
    }

    pub fn failed_steps(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|s| s.status == StepStatus::Failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed_steps().next().is_some()
    }
}

/// Models tend to emit `"result": ""` for steps that have not run yet
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// `"dependencies": null` means no dependencies
fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<u32>>::deserialize(deserializer)?.unwrap_or_default())
}
