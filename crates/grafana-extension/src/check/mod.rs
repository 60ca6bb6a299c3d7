//! Alert rule state check.
//!
//! A check covers a fixed window. The caller polls [`AlertRuleStateCheck::status`]
//! until it reports `completed`; each poll reads the rule's current state from
//! Grafana and evaluates it against the expected states.

mod metric;
mod state;

pub use metric::{to_metric, Metric, Severity, METRIC_NAME};
pub use state::*;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::{
    discovery::{ATTR_DATASOURCE, ATTR_DATASOURCE_UID, ATTR_ID, ATTR_NAME},
    grafana::{AlertRule, GrafanaApi},
    Error, Result, TARGET_TYPE,
};

/// Lifecycle every action exposes to the action framework.
#[async_trait]
pub trait Action: Send + Sync {
    type State: Send;

    fn describe(&self) -> Value;
    async fn prepare(&self, request: PrepareRequest) -> Result<Self::State>;
    async fn start(&self, state: &mut Self::State) -> Result<()>;
    async fn status(&self, state: &mut Self::State) -> Result<StatusResult>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckError {
    pub title: String,
    pub status: String,
}

impl CheckError {
    fn failed(title: String) -> Self {
        Self {
            title,
            status: "failed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResult {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CheckError>,
    pub metrics: Vec<Metric>,
}

pub struct AlertRuleStateCheck {
    api: Arc<dyn GrafanaApi>,
}

impl AlertRuleStateCheck {
    pub fn new(api: Arc<dyn GrafanaApi>) -> Self {
        Self { api }
    }

    pub fn action_id() -> String {
        format!("{}.check", TARGET_TYPE)
    }

    pub fn prepare_at(request: PrepareRequest, now: DateTime<Utc>) -> Result<CheckState> {
        let attributes = &request.target.attributes;
        let first = |key: &str| attributes.get(key).and_then(|values| values.first()).cloned();

        let alert_rule_id = first(ATTR_ID).ok_or_else(|| {
            Error::Config(format!("Target is missing the '{}' attribute.", ATTR_ID))
        })?;
        let alert_rule_name = first(ATTR_NAME).ok_or_else(|| {
            Error::Config(format!("Target is missing the '{}' attribute.", ATTR_NAME))
        })?;
        let alert_rule_datasource = first(ATTR_DATASOURCE).unwrap_or_default();
        let alert_rule_datasource_uid = first(ATTR_DATASOURCE_UID)
            .unwrap_or_else(|| alert_rule_datasource.to_lowercase());
        if alert_rule_datasource_uid.is_empty() {
            return Err(Error::Config(format!(
                "Target is missing the '{}' attribute.",
                ATTR_DATASOURCE
            )));
        }

        let config = request.config;
        if config.duration == 0 {
            return Err(Error::Config("Duration must be greater than zero.".to_string()));
        }
        let out_of_range = || Error::Config(format!("Duration {} is out of range.", config.duration));
        let end = i64::try_from(config.duration)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|duration| now.checked_add_signed(duration))
            .ok_or_else(out_of_range)?;

        Ok(CheckState {
            alert_rule_id,
            alert_rule_datasource,
            alert_rule_datasource_uid,
            alert_rule_name,
            end,
            expected_state: config.expected_state_list.unwrap_or_default(),
            state_check_mode: config.state_check_mode.unwrap_or_default(),
            state_check_success: false,
        })
    }

    pub async fn status_at(&self, state: &mut CheckState, now: DateTime<Utc>) -> Result<StatusResult> {
        let not_found = || Error::RuleNotFound {
            rule: state.alert_rule_name.clone(),
            datasource: state.alert_rule_datasource.clone(),
        };

        let states = self
            .api
            .alert_rules(&state.alert_rule_datasource_uid)
            .await?
            .ok_or_else(not_found)?;
        let rule = states
            .find_rule(&state.alert_rule_name)
            .ok_or_else(not_found)?;

        debug!(
            "Alert rule {} is {} (expected {:?})",
            rule.name, rule.state, state.expected_state
        );

        Ok(evaluate(state, rule, now, &self.api.base_url()))
    }
}

/// One poll's verdict. Only `state_check_success` is mutated.
pub fn evaluate(state: &mut CheckState, rule: &AlertRule, now: DateTime<Utc>, base_url: &str) -> StatusResult {
    let completed = now >= state.end;
    let mut error = None;

    if !state.expected_state.is_empty() {
        let expected = state.expected_state.contains(&rule.state);
        match state.state_check_mode {
            StateCheckMode::AllTheTime => {
                if !expected {
                    error = Some(CheckError::failed(format!(
                        "AlertRule '{}' has state '{}' whereas '{}' is expected.",
                        rule.name,
                        rule.state,
                        state.expected_state.join(", ")
                    )));
                }
            }
            StateCheckMode::AtLeastOnce => {
                if expected {
                    state.state_check_success = true;
                }
                if completed && !state.state_check_success {
                    error = Some(CheckError::failed(format!(
                        "AlertRule '{}' didn't have status '{}' at least once.",
                        rule.name,
                        state.expected_state.join(", ")
                    )));
                }
            }
        }
    }

    StatusResult {
        completed,
        error,
        metrics: vec![to_metric(&state.alert_rule_id, rule, now, base_url)],
    }
}

#[async_trait]
impl Action for AlertRuleStateCheck {
    type State = CheckState;

    fn describe(&self) -> Value {
        json!({
            "id": Self::action_id(),
            "label": "Alert Rule Check",
            "description": "collects information about the alert rule state and optionally verifies that the state value is the one expected.",
            "version": env!("CARGO_PKG_VERSION"),
            "technology": "Grafana",
            "kind": "check",
            "timeControl": "internal",
            "targetSelection": {
                "targetType": TARGET_TYPE,
                "quantityRestriction": "all",
                "selectionTemplates": [{
                    "label": "default",
                    "description": "Find alert rule by id",
                    "query": format!("{}=\"\"", ATTR_ID),
                }],
            },
            "parameters": [
                {
                    "name": "duration",
                    "label": "Duration",
                    "type": "duration",
                    "defaultValue": "30s",
                    "order": 1,
                    "required": true,
                },
                {
                    "name": "expectedStateList",
                    "label": "Expected State List",
                    "type": "string_array",
                    "options": [
                        {"label": "Firing", "value": "firing"},
                        {"label": "Pending", "value": "pending"},
                        {"label": "Normal", "value": "normal"},
                        {"label": "Inactive", "value": "inactive"},
                    ],
                    "order": 2,
                    "required": false,
                },
                {
                    "name": "stateCheckMode",
                    "label": "State Check Mode",
                    "description": "How often should the state be checked ?",
                    "type": "string",
                    "defaultValue": StateCheckMode::AllTheTime.to_string(),
                    "options": [
                        {"label": "All the time", "value": StateCheckMode::AllTheTime.to_string()},
                        {"label": "At least once", "value": StateCheckMode::AtLeastOnce.to_string()},
                    ],
                    "order": 3,
                    "required": true,
                },
            ],
            "widgets": [{
                "type": "com.steadybit.widget.state_over_time",
                "title": "Grafana Alert Rule State",
                "identity": {"from": ATTR_ID},
                "label": {"from": ATTR_NAME},
                "state": {"from": "state"},
                "tooltip": {"from": "tooltip"},
                "url": {"from": "url"},
                "value": {"hide": true},
            }],
            "prepare": {"method": "POST", "path": "/actions/alert-rule-check/prepare"},
            "start": {"method": "POST", "path": "/actions/alert-rule-check/start"},
            "status": {
                "method": "POST",
                "path": "/actions/alert-rule-check/status",
                "callInterval": "1s",
            },
        })
    }

    async fn prepare(&self, request: PrepareRequest) -> Result<CheckState> {
        Self::prepare_at(request, Utc::now())
    }

    async fn start(&self, _state: &mut CheckState) -> Result<()> {
        Ok(())
    }

    async fn status(&self, state: &mut CheckState) -> Result<StatusResult> {
        self.status_at(state, Utc::now()).await
    }
}
