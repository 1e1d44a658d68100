//! Strict plan schema validation
//!
//! Walks a parsed JSON value and reports every field that does not match the
//! plan wire schema, with a path to the offending field. Unknown fields are
//! rejected so that a model drifting from the schema is caught early.

use serde_json::{Map, Value};
use std::fmt;

use crate::conductor::types::{PlanStatus, StepStatus};

const PLAN_FIELDS: &[&str] = &["user_request", "title", "description", "steps", "status"];
const STEP_FIELDS: &[&str] = &[
    "step_number",
    "description",
    "agent_config",
    "dependencies",
    "status",
    "result",
    "feedback",
];
const AGENT_CONFIG_FIELDS: &[&str] = &["system_prompt", "task_prompt"];

/// A single schema violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Location such as `steps[2].agent_config.task_prompt`
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate `value` against the plan schema, collecting all issues.
pub fn validate_plan(value: &Value) -> Result<(), Vec<FieldIssue>> {
    let mut issues = Vec::new();

    match value.as_object() {
        Some(root) => check_plan(root, &mut issues),
        None => issues.push(issue("$", format!("expected object, found {}", kind(value)))),
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn check_plan(root: &Map<String, Value>, issues: &mut Vec<FieldIssue>) {
    reject_unknown(root, PLAN_FIELDS, "", issues);

    require_string(root, "user_request", "", issues);
    require_string(root, "title", "", issues);
    require_string(root, "description", "", issues);
    optional_enum(root, "status", &PlanStatus::ALL, "", issues);

    match root.get("steps") {
        None => issues.push(issue("steps", "missing required field")),
        Some(Value::Array(steps)) => {
            for (i, step) in steps.iter().enumerate() {
                let path = format!("steps[{}]", i);
                match step.as_object() {
                    Some(step) => check_step(step, &path, issues),
                    None => issues.push(issue(
                        &path,
                        format!("expected object, found {}", kind(step)),
                    )),
                }
            }
        }
        Some(other) => issues.push(issue(
            "steps",
            format!("expected array, found {}", kind(other)),
        )),
    }
}

fn check_step(step: &Map<String, Value>, path: &str, issues: &mut Vec<FieldIssue>) {
    reject_unknown(step, STEP_FIELDS, path, issues);

    let number_path = join(path, "step_number");
    match step.get("step_number") {
        None => issues.push(issue(&number_path, "missing required field")),
        Some(v) if as_u32(v).is_none() => issues.push(issue(
            &number_path,
            format!("expected non-negative integer, found {}", kind(v)),
        )),
        Some(_) => {}
    }

    require_string(step, "description", path, issues);

    let config_path = join(path, "agent_config");
    match step.get("agent_config") {
        None => issues.push(issue(&config_path, "missing required field")),
        Some(Value::Object(config)) => {
            reject_unknown(config, AGENT_CONFIG_FIELDS, &config_path, issues);
            require_string(config, "system_prompt", &config_path, issues);
            require_string(config, "task_prompt", &config_path, issues);
        }
        Some(other) => issues.push(issue(
            &config_path,
            format!("expected object, found {}", kind(other)),
        )),
    }

    match step.get("dependencies") {
        None | Some(Value::Null) => {}
        Some(Value::Array(deps)) => {
            for (i, dep) in deps.iter().enumerate() {
                if as_u32(dep).is_none() {
                    issues.push(issue(
                        &format!("{}.dependencies[{}]", path, i),
                        format!("expected non-negative integer, found {}", kind(dep)),
                    ));
                }
            }
        }
        Some(other) => issues.push(issue(
            &join(path, "dependencies"),
            format!("expected array, found {}", kind(other)),
        )),
    }

    optional_enum(step, "status", &StepStatus::ALL, path, issues);
    optional_string(step, "result", path, issues);
    optional_string(step, "feedback", path, issues);
}

fn reject_unknown(
    map: &Map<String, Value>,
    allowed: &[&str],
    path: &str,
    issues: &mut Vec<FieldIssue>,
) {
    for key in map.keys() {
        if !allowed.contains(&key.as_str()) {
            issues.push(issue(&join(path, key), "unknown field"));
        }
    }
}

fn require_string(map: &Map<String, Value>, field: &str, path: &str, issues: &mut Vec<FieldIssue>) {
    match map.get(field) {
        None => issues.push(issue(&join(path, field), "missing required field")),
        Some(Value::String(_)) => {}
        Some(other) => issues.push(issue(
            &join(path, field),
            format!("expected string, found {}", kind(other)),
        )),
    }
}

fn optional_string(
    map: &Map<String, Value>,
    field: &str,
    path: &str,
    issues: &mut Vec<FieldIssue>,
) {
    match map.get(field) {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => issues.push(issue(
            &join(path, field),
            format!("expected string or null, found {}", kind(other)),
        )),
    }
}

fn optional_enum(
    map: &Map<String, Value>,
    field: &str,
    allowed: &[&str],
    path: &str,
    issues: &mut Vec<FieldIssue>,
) {
    match map.get(field) {
        None => {}
        Some(Value::String(s)) if allowed.contains(&s.as_str()) => {}
        Some(Value::String(s)) => issues.push(issue(
            &join(path, field),
            format!("unknown value '{}', expected one of: {}", s, allowed.join(", ")),
        )),
        Some(other) => issues.push(issue(
            &join(path, field),
            format!("expected string, found {}", kind(other)),
        )),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|n| u32::try_from(n).ok())
}

fn join(path: &str, field: &str) -> String {
    if path.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", path, field)
    }
}

fn issue(path: &str, message: impl Into<String>) -> FieldIssue {
    FieldIssue {
        path: path.to_string(),
        message: message.into(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
