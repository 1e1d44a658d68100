//! Integration tests for the planner against an OpenAI-compatible endpoint
//!
//! A wiremock server stands in for OpenRouter so the full path
//! (HTTP request, extraction, schema validation) is exercised.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use foreman_engine::conductor::{Planner, PlannerConfig, StepStatus, PLANNER_SYSTEM_PROMPT};
use foreman_engine::config::ProviderConfig;
use foreman_engine::llm::{LLMProvider, OpenAICompatibleProvider};
use foreman_engine::secrets::SecretString;
use sdk::errors::EngineError;

const PLAN_JSON: &str = r#"{
  "user_request": "something the model made up",
  "title": "Product Launch Plan",
  "description": "Prepare and announce the launch",
  "steps": [
    {
      "step_number": 1,
      "description": "Analyse the market",
      "agent_config": {
        "system_prompt": "You are a market analyst.",
        "task_prompt": "Summarise the competitor landscape."
      },
      "dependencies": [],
      "status": "pending",
      "result": ""
    },
    {
      "step_number": 2,
      "description": "Draft the announcement",
      "agent_config": {
        "system_prompt": "You are a copywriter.",
        "task_prompt": "Draft a launch announcement."
      },
      "dependencies": [1],
      "status": "pending",
      "result": ""
    }
  ],
  "status": "awaiting_confirmation"
}"#;

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "gen-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn provider_for(server: &MockServer) -> OpenAICompatibleProvider {
    let config = ProviderConfig {
        base_url: server.uri(),
        model: "deepseek/deepseek-r1:free".to_string(),
        api_key_env: "OPENROUTER_API_KEY".to_string(),
    };
    OpenAICompatibleProvider::new(
        "openrouter",
        &config,
        SecretString::new("sk-or-test-key"),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn planner_for(server: &MockServer) -> Planner {
    let llm: Arc<dyn LLMProvider> = Arc::new(provider_for(server));
    Planner::new(llm, PlannerConfig::default())
}

#[tokio::test]
async fn test_plan_from_prose_wrapped_reply() {
    let server = MockServer::start().await;

    let reply = format!(
        "Sure! Here is the plan you asked for:\n\n```json\n{}\n```\n\n{}",
        PLAN_JSON, "Let me know if you need changes."
    );

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-or-test-key"))
        .and(body_partial_json(json!({
            "model": "deepseek/deepseek-r1:free",
            "messages": [
                {"role": "system", "content": PLANNER_SYSTEM_PROMPT},
                {
                    "role": "user",
                    "content": "Create a detailed plan for this request: Plan a product launch"
                }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply)))
        .expect(1)
        .mount(&server)
        .await;

    let plan = planner_for(&server)
        .generate_plan("Plan a product launch")
        .await
        .unwrap();

    assert_eq!(plan.user_request, "Plan a product launch");
    assert_eq!(plan.title, "Product Launch Plan");
    assert_eq!(plan.steps.len(), 2);
    assert_eq!(plan.steps[0].step_number, 1);
    assert_eq!(
        plan.steps[1].agent_config.task_prompt,
        "Draft a launch announcement."
    );
    assert!(plan
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Pending && s.result.is_none()));
}

#[tokio::test]
async fn test_unparseable_reply_is_parse_error_with_raw_text() {
    let server = MockServer::start().await;
    let reply = "I cannot help with planning today.";

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
        .mount(&server)
        .await;

    let err = planner_for(&server).generate_plan("anything").await.unwrap_err();

    assert!(matches!(err, EngineError::PlanParse { .. }));
    assert_eq!(err.raw_response(), Some(reply));
}

#[tokio::test]
async fn test_schema_violation_is_validation_error() {
    let server = MockServer::start().await;
    let reply = r#"{"title": "Incomplete", "description": "d", "steps": [
        {"step_number": "one", "description": "x",
         "agent_config": {"system_prompt": "s", "task_prompt": "t"}}
    ]}"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
        .mount(&server)
        .await;

    match planner_for(&server).generate_plan("anything").await {
        Err(EngineError::PlanValidation { issues }) => {
            assert!(issues.iter().any(|i| i.starts_with("steps[0].step_number")));
        }
        other => panic!("expected PlanValidation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_auth_failure_is_provider_error_without_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid key sk-or-v1-0123456789abcdefghijklmnop"}
        })))
        .mount(&server)
        .await;

    let err = planner_for(&server).generate_plan("anything").await.unwrap_err();

    match &err {
        EngineError::LLMProvider(msg) => {
            assert!(msg.starts_with("Authentication failed"));
            assert!(!msg.contains("0123456789abcdefghijklmnop"));
        }
        other => panic!("expected LLMProvider, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = planner_for(&server).generate_plan("anything").await.unwrap_err();
    match err {
        EngineError::LLMProvider(msg) => {
            assert!(msg.contains("500"));
            assert!(msg.contains("upstream exploded"));
        }
        other => panic!("expected LLMProvider, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_check_lists_models() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .and(header("Authorization", "Bearer sk-or-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(provider_for(&server).check_health().await);
}

#[tokio::test]
async fn test_health_check_rejected_key_is_unhealthy() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(!provider_for(&server).check_health().await);
}
