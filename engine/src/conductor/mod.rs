//! Conductor System
//!
//! Turns a natural-language request into a structured plan and runs it.

pub mod executor;
pub mod extract;
pub mod planner;
pub mod schema;
pub mod types;

pub use executor::{ExecutionMode, Executor, ExecutorConfig};
pub use planner::{Planner, PlannerConfig, PLANNER_SYSTEM_PROMPT};
pub use types::{AgentConfig, Plan, PlanStatus, Step, StepStatus};

use sdk::errors::EngineError;

/// Single-threaded runtime backing the `*_blocking` entry points
pub(crate) fn blocking_runtime() -> Result<tokio::runtime::Runtime, EngineError> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
