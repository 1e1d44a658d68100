//! Interactive console
//!
//! A line-oriented session over plans kept in memory. Plans get a short id
//! when created and are lost when the session ends.
//!
//! ```text
//! foreman> plan Plan a product launch
//! foreman> feedback plan-1a2b3c4d 2 Mention the price
//! foreman> modify plan-1a2b3c4d Add a pricing step
//! foreman> execute plan-1a2b3c4d
//! ```

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use uuid::Uuid;

use crate::conductor::{Executor, Plan, Planner};
use crate::handlers::{render_plan, render_report};
use sdk::errors::{EngineError, ForemanErrorExt};

const HELP: &str = "\
Commands:
  plan <request>                 Generate a new plan
  modify <id> <changes>          Ask the model to revise a plan
  feedback <id> <step> <text>    Attach feedback to a step
  execute <id>                   Confirm and run a plan
  status [<id>]                  List plans, or show one
  help                           Show this help
  quit                           Leave the console";

/// Outcome of a single console line
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Output(String),
    Quit,
}

pub struct Console {
    planner: Planner,
    executor: Executor,
    plans: HashMap<String, Plan>,
    order: Vec<String>,
}

impl Console {
    pub fn new(planner: Planner, executor: Executor) -> Self {
        Self {
            planner,
            executor,
            plans: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn plan(&self, id: &str) -> Option<&Plan> {
        self.plans.get(id)
    }

    /// Ids of the session's plans, oldest first
    pub fn plan_ids(&self) -> &[String] {
        &self.order
    }

    /// Read commands from `input` until `quit` or end of input
    pub async fn run<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        writeln!(output, "Foreman console. Type 'help' for commands.")?;
        let mut lines = input.lines();

        loop {
            write!(output, "foreman> ")?;
            output.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(output)?;
                break;
            };

            match self.dispatch(&line).await {
                Reply::Output(text) if text.is_empty() => {}
                Reply::Output(text) => writeln!(output, "{}", text.trim_end())?,
                Reply::Quit => break,
            }
        }
        Ok(())
    }

    /// Execute one console line
    pub async fn dispatch(&mut self, line: &str) -> Reply {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };

        let result = match command {
            "" => Ok(String::new()),
            "quit" | "exit" => return Reply::Quit,
            "help" => Ok(HELP.to_string()),
            "plan" => self.create(rest).await,
            "modify" => self.modify(rest).await,
            "feedback" => self.feedback(rest),
            "execute" => self.execute(rest).await,
            "status" => self.status(rest),
            other => Ok(format!("Unknown command '{}'. Type 'help' for commands.", other)),
        };

        match result {
            Ok(text) => Reply::Output(text),
            Err(e) => {
                tracing::debug!("Console command failed: {:?}", e);
                Reply::Output(format!("Error: {}\nHint: {}", e, e.user_hint()))
            }
        }
    }

    async fn create(&mut self, request: &str) -> Result<String, EngineError> {
        if request.is_empty() {
            return Ok("Usage: plan <request>".to_string());
        }

        let plan = self.planner.generate_plan(request).await?;
        let id = format!("plan-{}", &Uuid::new_v4().simple().to_string()[..8]);
        let text = format!("Created {}\n{}", id, render_plan(&plan));

        self.plans.insert(id.clone(), plan);
        self.order.push(id);
        Ok(text)
    }

    async fn modify(&mut self, args: &str) -> Result<String, EngineError> {
        let Some((id, changes)) = args.split_once(char::is_whitespace) else {
            return Ok("Usage: modify <id> <changes>".to_string());
        };

        let current = self.get(id)?;
        let revised = self.planner.modify_plan(current, changes.trim()).await?;
        let text = format!("Updated {}\n{}", id, render_plan(&revised));
        self.plans.insert(id.to_string(), revised);
        Ok(text)
    }

    fn feedback(&mut self, args: &str) -> Result<String, EngineError> {
        let mut parts = args.splitn(3, char::is_whitespace);
        let (Some(id), Some(step), Some(text)) = (parts.next(), parts.next(), parts.next()) else {
            return Ok("Usage: feedback <id> <step> <text>".to_string());
        };
        let Ok(step_number) = step.parse::<u32>() else {
            return Ok(format!("'{}' is not a step number", step));
        };

        let plan = self.get_mut(id)?;
        if plan.set_feedback(step_number, text.trim()) {
            Ok(format!("Feedback recorded for step {} of {}", step_number, id))
        } else {
            Ok(format!("{} has no step {}", id, step_number))
        }
    }

    async fn execute(&mut self, id: &str) -> Result<String, EngineError> {
        if id.is_empty() {
            return Ok("Usage: execute <id>".to_string());
        }

        let plan = self
            .plans
            .get_mut(id)
            .ok_or_else(|| EngineError::PlanNotFound(id.to_string()))?;
        plan.confirm();
        self.executor.execute_plan_in_place(plan).await;
        Ok(render_report(plan))
    }

    fn status(&self, id: &str) -> Result<String, EngineError> {
        if !id.is_empty() {
            return Ok(render_plan(self.get(id)?));
        }
        if self.order.is_empty() {
            return Ok("No plans yet. Use 'plan <request>' to create one.".to_string());
        }

        let lines: Vec<String> = self
            .order
            .iter()
            .filter_map(|id| self.plans.get(id).map(|p| (id, p)))
            .map(|(id, p)| {
                let failed = p.failed_steps().count();
                let suffix = if failed > 0 {
                    format!(", {} failed", failed)
                } else {
                    String::new()
                };
                format!(
                    "{}  {}  [{}] {} steps{}",
                    id,
                    p.title,
                    p.status,
                    p.steps.len(),
                    suffix
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    fn get(&self, id: &str) -> Result<&Plan, EngineError> {
        self.plans
            .get(id)
            .ok_or_else(|| EngineError::PlanNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Plan, EngineError> {
        self.plans
            .get_mut(id)
            .ok_or_else(|| EngineError::PlanNotFound(id.to_string()))
    }
}
