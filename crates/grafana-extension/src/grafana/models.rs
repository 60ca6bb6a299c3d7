use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub org_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub ds_type: String,
    #[serde(default)]
    pub type_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub read_only: bool,
}

impl DataSource {
    /// The backend's own rule engine, queried like a datasource.
    pub fn builtin() -> Self {
        Self {
            uid: "grafana".to_string(),
            name: "grafana".to_string(),
            ds_type: "grafana".to_string(),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.uid
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertsStates {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub data: AlertsData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertsData {
    #[serde(default)]
    pub groups: Vec<AlertGroup>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertGroup {
    pub name: String,
    #[serde(default)]
    pub rules: Vec<AlertRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub health: String,
    #[serde(default, rename = "type")]
    pub rule_type: String,
    #[serde(default)]
    pub last_evaluation: Option<DateTime<Utc>>,
}

impl AlertsStates {
    /// First rule with the given name, searching every group.
    pub fn find_rule(&self, name: &str) -> Option<&AlertRule> {
        self.data
            .groups
            .iter()
            .flat_map(|group| group.rules.iter())
            .find(|rule| rule.name == name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: i64,
    #[serde(default)]
    pub dashboard_uid: Option<String>,
    #[serde(default)]
    pub panel_id: i64,
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub time_end: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub new_state: String,
    #[serde(default)]
    pub prev_state: String,
}

/// Body of `POST /api/annotations`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateAnnotation {
    pub tags: Vec<String>,
    pub time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<i64>,
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub id: Option<i64>,
}
