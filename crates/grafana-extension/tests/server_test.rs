mod common;

use axum::http::StatusCode;
use grafana_extension::{
    config::DiscoveryConfig,
    discovery::{AlertRuleDiscovery, TargetCache},
    grafana::GrafanaApi,
    server::Server,
};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::{
    matchers::{body_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

async fn test_server(grafana: &MockServer) -> (axum_test::TestServer, Arc<TargetCache>) {
    let api: Arc<dyn GrafanaApi> = Arc::new(common::client(grafana));
    let discovery_config = DiscoveryConfig {
        host: Some("grafana-host".to_string()),
        ..Default::default()
    };
    let targets = Arc::new(TargetCache::new(AlertRuleDiscovery::new(
        api.clone(),
        &discovery_config,
    )));
    let app = Server::new(api, targets.clone()).build_router();
    (axum_test::TestServer::new(app).unwrap(), targets)
}

fn prepare_body(expected: &[&str], mode: &str) -> Value {
    json!({
        "target": {"attributes": {
            "grafana.alert-rule.id": ["grafana-host-p1-G-r1"],
            "grafana.alert-rule.name": ["r1"],
            "grafana.alert-rule.datasource": ["p1"],
            "grafana.alert-rule.datasource-uid": ["p1"],
        }},
        "config": {"duration": 60000, "expectedStateList": expected, "stateCheckMode": mode},
        "executionId": 1,
    })
}

#[tokio::test]
async fn index_lists_event_listeners() {
    let grafana = MockServer::start().await;
    let (client, _) = test_server(&grafana).await;

    let response = client.get("/").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let listeners = body["eventListeners"].as_array().unwrap();
    assert_eq!(listeners.len(), 4);
    assert!(listeners
        .iter()
        .any(|l| l["path"] == "/events/experiment-step-completed"));
}

#[tokio::test]
async fn discovery_exposes_rules_as_targets() {
    let grafana = MockServer::start().await;
    common::mount_single_rule(&grafana, "firing").await;
    let (client, targets) = test_server(&grafana).await;

    assert_eq!(targets.refresh().await, 1);

    let response = client.get("/discovery/alert-rules/discovered-targets").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let found = body["targets"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], "grafana-host-p1-G-r1");
    assert_eq!(found[0]["attributes"]["grafana.alert-rule.state"], json!(["firing"]));
}

#[tokio::test]
async fn discovery_description_advertises_refresh_interval() {
    let grafana = MockServer::start().await;
    let (client, _) = test_server(&grafana).await;

    let body: Value = client.get("/discovery/alert-rules").await.json();
    assert_eq!(body["discover"]["callInterval"], "60s");
}

#[tokio::test]
async fn check_reports_state_and_metric() {
    let grafana = MockServer::start().await;
    common::mount_single_rule(&grafana, "firing").await;
    let (client, _) = test_server(&grafana).await;

    let prepared: Value = client
        .post("/actions/alert-rule-check/prepare")
        .json(&prepare_body(&["firing"], "allTheTime"))
        .await
        .json();
    let state = prepared["state"].clone();
    assert_eq!(state["alertRuleId"], "grafana-host-p1-G-r1");

    let started = client
        .post("/actions/alert-rule-check/start")
        .json(&json!({"state": state}))
        .await;
    assert_eq!(started.status_code(), StatusCode::OK);

    let response = client
        .post("/actions/alert-rule-check/status")
        .json(&json!({"state": state}))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let status: Value = response.json();
    assert_eq!(status["completed"], false);
    assert!(status.get("error").is_none());
    let metric = &status["metrics"][0];
    assert_eq!(metric["name"], "alert_rule_state");
    assert_eq!(metric["metric"]["state"], "danger");
    assert_eq!(metric["metric"]["grafana.alert-rule.id"], "grafana-host-p1-G-r1");
}

#[tokio::test]
async fn check_fails_immediately_on_unexpected_state() {
    let grafana = MockServer::start().await;
    common::mount_single_rule(&grafana, "normal").await;
    let (client, _) = test_server(&grafana).await;

    let prepared: Value = client
        .post("/actions/alert-rule-check/prepare")
        .json(&prepare_body(&["firing"], "all-the-time"))
        .await
        .json();

    let status: Value = client
        .post("/actions/alert-rule-check/status")
        .json(&json!({"state": prepared["state"]}))
        .await
        .json();
    assert_eq!(status["completed"], false);
    assert_eq!(status["error"]["status"], "failed");
    assert!(status["error"]["title"].as_str().unwrap().contains("'normal'"));
}

#[tokio::test]
async fn prepare_without_rule_id_is_rejected() {
    let grafana = MockServer::start().await;
    let (client, _) = test_server(&grafana).await;

    let response = client
        .post("/actions/alert-rule-check/prepare")
        .json(&json!({"target": {"attributes": {}}, "config": {"duration": 1000}}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["title"].as_str().unwrap().contains("grafana.alert-rule.id"));
}

#[tokio::test]
async fn status_for_unknown_rule_is_an_error() {
    let grafana = MockServer::start().await;
    common::mount_single_rule(&grafana, "firing").await;
    let (client, _) = test_server(&grafana).await;

    let mut body = prepare_body(&[], "allTheTime");
    body["target"]["attributes"]["grafana.alert-rule.name"] = json!(["gone"]);
    let prepared: Value = client
        .post("/actions/alert-rule-check/prepare")
        .json(&body)
        .await
        .json();

    let response = client
        .post("/actions/alert-rule-check/status")
        .json(&json!({"state": prepared["state"]}))
        .await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = response.json();
    assert!(error["title"].as_str().unwrap().contains("gone"));
}

#[tokio::test]
async fn experiment_started_creates_annotation() {
    let grafana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/annotations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&grafana)
        .await;
    let (client, _) = test_server(&grafana).await;

    let response = client
        .post("/events/experiment-started")
        .json(&common::event("experiment.execution.created"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({}));
}

#[tokio::test]
async fn experiment_completed_patches_the_single_match() {
    let grafana = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/annotations"))
        .and(query_param("tags", "execution_id:73983"))
        .and(query_param("tags", "experiment_key:ADM-891"))
        .and(query_param("tags", "event:experiment.execution.created"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 42}])))
        .expect(1)
        .mount(&grafana)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/annotations/42"))
        .and(body_json(json!({"timeEnd": 1721293200000i64})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Annotation patched"})))
        .expect(1)
        .mount(&grafana)
        .await;
    let (client, _) = test_server(&grafana).await;

    let response = client
        .post("/events/experiment-completed")
        .json(&common::event("experiment.execution.completed"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn step_completed_with_ambiguous_matches_patches_nothing() {
    let grafana = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/annotations"))
        .and(query_param("tags", "step_experiment_key:ADM-891"))
        .and(query_param("tags", "event:experiment.execution.step-started"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}, {"id": 2}])))
        .expect(1)
        .mount(&grafana)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&grafana)
        .await;
    let (client, _) = test_server(&grafana).await;

    let response = client
        .post("/events/experiment-step-completed")
        .json(&common::step_event("experiment.execution.step-completed"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn annotation_failures_do_not_reach_the_caller() {
    let grafana = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/annotations"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&grafana)
        .await;
    let (client, _) = test_server(&grafana).await;

    let response = client
        .post("/events/experiment-step-started")
        .json(&common::step_event("experiment.execution.step-started"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_event_is_a_decode_error() {
    let grafana = MockServer::start().await;
    let (client, _) = test_server(&grafana).await;

    let response = client.post("/events/experiment-started").text("not json").await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["title"], "Failed to decode request body");
}

#[tokio::test]
async fn step_event_without_step_payload_is_rejected() {
    let grafana = MockServer::start().await;
    let (client, _) = test_server(&grafana).await;

    let response = client
        .post("/events/experiment-step-started")
        .json(&common::event("experiment.execution.step-started"))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn completed_event_without_execution_is_rejected() {
    let grafana = MockServer::start().await;
    let (client, _) = test_server(&grafana).await;

    let mut event = common::event("experiment.execution.completed");
    event.as_object_mut().unwrap().remove("experimentExecution");

    let response = client.post("/events/experiment-completed").json(&event).await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(grafana.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn metrics_are_exposed() {
    let grafana = MockServer::start().await;
    let (client, targets) = test_server(&grafana).await;
    targets.refresh().await;

    let response = client.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("grafana_extension_discovery_cycles_total"));
}
