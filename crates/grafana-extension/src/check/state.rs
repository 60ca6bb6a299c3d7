use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum StateCheckMode {
    /// Every poll must observe an expected state.
    #[default]
    #[serde(rename = "all-the-time", alias = "allTheTime")]
    AllTheTime,
    /// At least one poll within the window must observe an expected state.
    #[serde(rename = "at-least-once", alias = "atLeastOnce")]
    AtLeastOnce,
}

impl fmt::Display for StateCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateCheckMode::AllTheTime => write!(f, "all-the-time"),
            StateCheckMode::AtLeastOnce => write!(f, "at-least-once"),
        }
    }
}

/// Parameters of one check, as configured by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckConfig {
    /// Window length in milliseconds.
    pub duration: u64,
    #[serde(default)]
    pub expected_state_list: Option<Vec<String>>,
    #[serde(default)]
    pub state_check_mode: Option<StateCheckMode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetRef {
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub target: TargetRef,
    pub config: CheckConfig,
    #[serde(default)]
    pub execution_id: Option<serde_json::Value>,
}

/// Per-check state. Round-trips through the caller between polls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckState {
    pub alert_rule_id: String,
    pub alert_rule_datasource: String,
    pub alert_rule_datasource_uid: String,
    pub alert_rule_name: String,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub expected_state: Vec<String>,
    #[serde(default)]
    pub state_check_mode: StateCheckMode,
    /// Set once an expected state has been observed; never cleared.
    #[serde(default)]
    pub state_check_success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateRequest {
    pub state: CheckState,
}
