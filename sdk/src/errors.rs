//! Error types and handling
//!
//! This module provides the error types used throughout the Foreman engine.
//! All errors implement the `ForemanErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Error Categories
//!
//! - **Configuration**: missing settings or credentials, fatal at startup
//! - **Plan generation**: unparseable or schema-violating model output, fatal
//!   to the `plan` operation
//! - **Step execution**: local to a single step, recorded on that step and
//!   never propagated past the executor loop

use thiserror::Error;

/// Trait for Foreman error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait ForemanErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and never contains
    /// credentials or raw model output.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors require the user to fix configuration first.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, ForemanErrorExt};
///
/// let error = EngineError::MissingTaskPrompt { step_number: 2 };
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("OPENROUTER_API_KEY not found in environment".into());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // LLM provider errors
    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    // Plan generation errors
    #[error("Failed to parse JSON from model response: {message}\nResponse: {response}")]
    PlanParse { message: String, response: String },

    #[error("Plan validation failed: {}", .issues.join("; "))]
    PlanValidation { issues: Vec<String> },

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    // Step execution errors
    #[error("Step {step_number} failed: {message}")]
    StepExecution { step_number: u32, message: String },

    #[error("task_prompt must be provided in the agent configuration (step {step_number})")]
    MissingTaskPrompt { step_number: u32 },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Raw model response attached to a parse failure, if any
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::PlanParse { response, .. } => Some(response),
            _ => None,
        }
    }
}

impl ForemanErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml and environment variables",

            Self::LLMProvider(_) => "LLM provider unavailable. Check your API key and network",

            Self::PlanParse { .. } => {
                "The model did not return valid JSON. Try again or rephrase the request"
            }
            Self::PlanValidation { .. } => {
                "The model returned a plan with missing or mistyped fields. Try again"
            }
            Self::PlanNotFound(_) => "Use 'plan' to create a plan first",

            Self::StepExecution { .. } => "Step failed. See the step result for details",
            Self::MissingTaskPrompt { .. } => {
                "The step has no task prompt. Modify the plan and retry"
            }

            Self::Serialization(_) => "A plan could not be converted to or from JSON",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Nothing can proceed until configuration is fixed
            Self::Config(_) => false,

            _ => true,
        }
    }
}
