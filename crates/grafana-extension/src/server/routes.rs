use axum::{body::Bytes, extract::State, Json};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::Server;
use crate::{
    annotations::{self, EventKind, EventRequestBody},
    check::{Action, AlertRuleStateCheck, CheckState, PrepareRequest, StateRequest, StatusResult},
    discovery::{ATTR_DATASOURCE, ATTR_GROUP, ATTR_HEALTH, ATTR_ID, ATTR_NAME, ATTR_STATE},
    metrics::gather_metrics,
    Result, TARGET_TYPE,
};

pub const DISCOVERY_PATH: &str = "/discovery/alert-rules";
pub const CHECK_PATH: &str = "/actions/alert-rule-check";

type AppState = State<Arc<Server>>;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: CheckState,
    #[serde(flatten)]
    pub result: StatusResult,
}

fn decode<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        debug!("Failed to decode request body: {}", e);
        e.into()
    })
}

pub async fn index() -> Json<Value> {
    let event_listeners: Vec<Value> = EventKind::ALL
        .iter()
        .map(|kind| {
            json!({
                "method": "POST",
                "path": kind.path(),
                "listenTo": kind.listen_to(),
            })
        })
        .collect();

    Json(json!({
        "actions": [{"method": "GET", "path": CHECK_PATH}],
        "discoveries": [{"method": "GET", "path": DISCOVERY_PATH}],
        "targetTypes": [{"method": "GET", "path": format!("{}/target-description", DISCOVERY_PATH)}],
        "targetAttributes": [{"method": "GET", "path": format!("{}/attribute-descriptions", DISCOVERY_PATH)}],
        "eventListeners": event_listeners,
    }))
}

pub async fn discovery_description(State(server): AppState) -> Json<Value> {
    Json(json!({
        "id": TARGET_TYPE,
        "discover": {
            "method": "GET",
            "path": format!("{}/discovered-targets", DISCOVERY_PATH),
            "callInterval": format!("{}s", server.targets.interval().as_secs()),
        },
    }))
}

pub async fn target_description() -> Json<Value> {
    Json(json!({
        "id": TARGET_TYPE,
        "version": env!("CARGO_PKG_VERSION"),
        "label": {"one": "Grafana alert rule", "other": "Grafana alert rules"},
        "category": "monitoring",
        "table": {
            "columns": [
                {"attribute": ATTR_NAME},
                {"attribute": ATTR_GROUP},
                {"attribute": ATTR_DATASOURCE},
                {"attribute": ATTR_STATE},
            ],
            "orderBy": [{"attribute": ATTR_NAME, "direction": "ASC"}],
        },
    }))
}

pub async fn attribute_descriptions() -> Json<Value> {
    let describe = |attribute: &str, one: &str, other: &str| {
        json!({"attribute": attribute, "label": {"one": one, "other": other}})
    };
    Json(json!({
        "attributes": [
            describe(ATTR_ID, "Alert rule id", "Alert rule ids"),
            describe(ATTR_NAME, "Alert rule name", "Alert rule names"),
            describe(ATTR_GROUP, "Alert rule group", "Alert rule groups"),
            describe(ATTR_DATASOURCE, "Datasource", "Datasources"),
            describe(ATTR_STATE, "Alert rule state", "Alert rule states"),
            describe(ATTR_HEALTH, "Alert rule health", "Alert rule health"),
        ],
    }))
}

pub async fn discovered_targets(State(server): AppState) -> Json<Value> {
    let targets = server.targets.targets().await;
    Json(json!({ "targets": targets.as_ref() }))
}

pub async fn check_description(State(server): AppState) -> Json<Value> {
    Json(server.check.describe())
}

pub async fn check_prepare(State(server): AppState, body: Bytes) -> Result<Json<Value>> {
    let request: PrepareRequest = decode(&body)?;
    let execution_id = request
        .execution_id
        .as_ref()
        .map_or_else(|| "-".to_string(), Value::to_string);
    let state = server.check.prepare(request).await?;
    info!(
        "Prepared {} for alert rule {} (execution {})",
        AlertRuleStateCheck::action_id(),
        state.alert_rule_id,
        execution_id
    );
    Ok(Json(json!({ "state": state })))
}

pub async fn check_start(State(server): AppState, body: Bytes) -> Result<Json<Value>> {
    let StateRequest { mut state } = decode(&body)?;
    server.check.start(&mut state).await?;
    Ok(Json(json!({ "state": state })))
}

pub async fn check_status(State(server): AppState, body: Bytes) -> Result<Json<StatusResponse>> {
    let StateRequest { mut state } = decode(&body)?;
    let result = server.check.status(&mut state).await?;
    Ok(Json(StatusResponse { state, result }))
}

async fn on_event(server: &Server, kind: EventKind, body: &Bytes) -> Result<Json<Value>> {
    let event: EventRequestBody = decode(body)?;
    debug!("Received {} event {}", event.event_name, event.id);

    let outcome = annotations::handle_event(server.grafana.as_ref(), kind, &event).await?;
    debug!("Annotation for event {}: {:?}", event.id, outcome);

    Ok(Json(json!({})))
}

pub async fn experiment_started(State(server): AppState, body: Bytes) -> Result<Json<Value>> {
    on_event(&server, EventKind::ExperimentStarted, &body).await
}

pub async fn experiment_completed(State(server): AppState, body: Bytes) -> Result<Json<Value>> {
    on_event(&server, EventKind::ExperimentCompleted, &body).await
}

pub async fn experiment_step_started(State(server): AppState, body: Bytes) -> Result<Json<Value>> {
    on_event(&server, EventKind::ExperimentStepStarted, &body).await
}

pub async fn experiment_step_completed(State(server): AppState, body: Bytes) -> Result<Json<Value>> {
    on_event(&server, EventKind::ExperimentStepCompleted, &body).await
}

pub async fn metrics() -> Result<String> {
    gather_metrics().map_err(|e| {
        error!("Error gathering metrics: {}", e);
        e
    })
}
