#![allow(dead_code)]

use grafana_extension::{config::GrafanaConfig, grafana::GrafanaClient};
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const TOKEN: &str = "test-token";

pub fn grafana_config(server: &MockServer) -> GrafanaConfig {
    GrafanaConfig {
        api_base_url: server.uri(),
        service_token: TOKEN.to_string(),
        request_timeout: Duration::from_secs(5),
    }
}

pub fn client(server: &MockServer) -> GrafanaClient {
    GrafanaClient::new(&grafana_config(server)).expect("client")
}

pub fn rules(group: &str, rules: &[(&str, &str)]) -> Value {
    let rules: Vec<Value> = rules
        .iter()
        .map(|(name, state)| {
            json!({
                "name": name,
                "state": state,
                "health": "ok",
                "type": "alerting",
                "lastEvaluation": "2024-07-18T08:00:00Z",
            })
        })
        .collect();
    json!({"status": "success", "data": {"groups": [{"name": group, "rules": rules}]}})
}

/// One prometheus datasource `p1` with rule `r1` in group `G`; the builtin
/// engine has no rules endpoint.
pub async fn mount_single_rule(server: &MockServer, state: &str) {
    Mock::given(method("GET"))
        .and(path("/api/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "uid": "p1", "name": "p1", "type": "prometheus"},
            {"id": 2, "uid": "alertmanager", "name": "Alertmanager", "type": "alertmanager"},
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/prometheus/p1/api/v1/rules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rules("G", &[("r1", state)])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/prometheus/grafana/api/v1/rules"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;
}

pub fn event(event_name: &str) -> Value {
    json!({
        "id": "6a1f8d1e-8b0c-4a53-9a3c-111111111111",
        "eventName": event_name,
        "eventTime": "2024-07-18T09:00:00Z",
        "environment": {"id": "e1", "name": "Global"},
        "tenant": {"key": "demo", "name": "Demo"},
        "team": {"id": "t1", "key": "ADM", "name": "Admins"},
        "experimentExecution": {
            "executionId": 73983,
            "experimentKey": "ADM-891",
            "name": "test extension-grafana",
            "startedTime": "2024-07-18T08:00:00Z",
            "endedTime": "2024-07-18T09:00:00Z"
        }
    })
}

pub fn step_event(event_name: &str) -> Value {
    let mut event = event(event_name);
    event["experimentStepExecution"] = json!({
        "id": "6a1f8d1e-8b0c-4a53-9a3c-222222222222",
        "executionId": 5,
        "experimentKey": "ADM-891",
        "type": "action",
        "actionId": "com.steadybit.extension_grafana.alert-rule.check",
        "actionName": "Alert Rule Check",
        "startedTime": "2024-07-18T08:10:00Z",
        "endedTime": "2024-07-18T08:20:00Z"
    });
    event
}
