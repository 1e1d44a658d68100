//! Conductor Planner
//!
//! Sends the user's request to the planning model, extracts the JSON plan
//! from its reply, and validates it into a `Plan`.

use crate::conductor::blocking_runtime;
use crate::conductor::extract::extract_json_object;
use crate::conductor::schema::validate_plan;
use crate::conductor::types::Plan;
use crate::llm::LLMProvider;
use sdk::errors::EngineError;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Instructions given to the planning model. The JSON layout in here is the
/// wire contract that `schema::validate_plan` enforces.
pub const PLANNER_SYSTEM_PROMPT: &str = concat!(
    "You are a master planning AI. Your job is to break down user requests ",
    "into a series of actionable steps that can be executed by specialized agents. ",
    "Create a comprehensive plan with clear step descriptions and agent configurations. ",
    "Each step should have a system_prompt and task_prompt in its agent_config.\n\n",
    "IMPORTANT: You must respond with ONLY valid JSON in this exact format:\n",
    "{\n",
    "  \"user_request\": \"The original user request\",\n",
    "  \"title\": \"Plan title\",\n",
    "  \"description\": \"Plan description\",\n",
    "  \"steps\": [\n",
    "    {\n",
    "      \"step_number\": 1,\n",
    "      \"description\": \"Step description\",\n",
    "      \"agent_config\": {\n",
    "        \"system_prompt\": \"System prompt for this step\",\n",
    "        \"task_prompt\": \"Task prompt for this step\"\n",
    "      },\n",
    "      \"dependencies\": [],\n",
    "      \"status\": \"pending\",\n",
    "      \"result\": \"\"\n",
    "    }\n",
    "  ],\n",
    "  \"status\": \"awaiting_confirmation\"\n",
    "}\n\n",
    "Do not include any text before or after the JSON. Only return valid JSON.",
    "Check your response carefully to ensure it is valid JSON ",
    "and follows the exact same format as above."
);

/// Planner settings
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub system_prompt: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            system_prompt: PLANNER_SYSTEM_PROMPT.to_string(),
        }
    }
}

pub struct Planner {
    llm: Arc<dyn LLMProvider>,
    config: PlannerConfig,
}

impl Planner {
    pub fn new(llm: Arc<dyn LLMProvider>, config: PlannerConfig) -> Self {
        Self { llm, config }
    }

    /// Generate a plan for `user_request`
    ///
    /// # Errors
    /// - `EngineError::LLMProvider` if the model call fails
    /// - `EngineError::PlanParse` if no JSON can be parsed from the reply
    /// - `EngineError::PlanValidation` if the JSON does not match the plan schema
    pub async fn generate_plan(&self, user_request: &str) -> Result<Plan, EngineError> {
        info!("Generating plan for: {}", user_request);

        let prompt = format!("Create a detailed plan for this request: {}", user_request);
        let response = self
            .llm
            .invoke(&self.config.system_prompt, &prompt)
            .await?;

        let plan = parse_plan_response(&response, user_request)?;
        info!("Generated plan '{}' with {} steps", plan.title, plan.steps.len());
        Ok(plan)
    }

    /// Blocking form of [`Planner::generate_plan`].
    ///
    /// Runs on a private current-thread runtime, so it must not be called
    /// from inside another Tokio runtime.
    pub fn generate_plan_blocking(&self, user_request: &str) -> Result<Plan, EngineError> {
        blocking_runtime()?.block_on(self.generate_plan(user_request))
    }

    /// Ask the model to revise `plan` according to `modifications`.
    ///
    /// Step feedback recorded on the plan is passed along. The revised plan
    /// keeps the original `user_request` and comes back unexecuted: steps
    /// pending without results, plan awaiting confirmation.
    pub async fn modify_plan(
        &self,
        plan: &Plan,
        modifications: &str,
    ) -> Result<Plan, EngineError> {
        info!("Modifying plan '{}'", plan.title);

        let current = serde_json::to_string_pretty(plan)?;
        let feedback: Vec<String> = plan
            .steps
            .iter()
            .filter_map(|s| {
                s.feedback
                    .as_ref()
                    .map(|f| format!("- Step {}: {}", s.step_number, f))
            })
            .collect();

        let mut prompt = format!(
            "Revise the plan for this request: {}\n\nCurrent plan:\n{}\n\n",
            plan.user_request, current
        );
        if !feedback.is_empty() {
            prompt.push_str("Feedback on individual steps:\n");
            prompt.push_str(&feedback.join("\n"));
            prompt.push_str("\n\n");
        }
        prompt.push_str(&format!(
            "Requested changes: {}\n\nReturn the complete revised plan.",
            modifications
        ));

        let response = self
            .llm
            .invoke(&self.config.system_prompt, &prompt)
            .await?;

        let mut revised = parse_plan_response(&response, &plan.user_request)?;
        revised.reset_for_review();
        Ok(revised)
    }
}

/// Turn a raw model reply into a validated `Plan`.
///
/// `user_request` always replaces whatever the model echoed back.
pub fn parse_plan_response(response: &str, user_request: &str) -> Result<Plan, EngineError> {
    debug!("Raw response from model: {}", response.trim());

    let mut value = extract_json_object(response).map_err(|message| EngineError::PlanParse {
        message,
        response: response.to_string(),
    })?;

    if let Value::Object(map) = &mut value {
        map.insert(
            "user_request".to_string(),
            Value::String(user_request.to_string()),
        );
    }

    validate_plan(&value).map_err(|issues| EngineError::PlanValidation {
        issues: issues.iter().map(|i| i.to_string()).collect(),
    })?;

    let plan: Plan = serde_json::from_value(value).map_err(|e| EngineError::PlanValidation {
        issues: vec![e.to_string()],
    })?;

    warn_on_step_numbering(&plan);
    Ok(plan)
}

fn warn_on_step_numbering(plan: &Plan) {
    let mut seen = HashSet::new();
    for step in &plan.steps {
        if !seen.insert(step.step_number) {
            warn!("Plan '{}' repeats step number {}", plan.title, step.step_number);
        }
    }

    let contiguous = plan
        .steps
        .iter()
        .enumerate()
        .all(|(i, s)| s.step_number as usize == i + 1);
    if !contiguous {
        warn!(
            "Plan '{}' step numbers are not 1..={}; executing in listed order",
            plan.title,
            plan.steps.len()
        );
    }
}
