use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle event sent by the experiment runner.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestBody {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub tenant: Tenant,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub experiment_execution: Option<ExperimentExecution>,
    #[serde(default)]
    pub experiment_step_execution: Option<ExperimentStepExecution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentExecution {
    #[serde(default)]
    pub execution_id: f64,
    #[serde(default)]
    pub experiment_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hypothesis: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub prepared_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentStepExecution {
    #[serde(default)]
    pub id: Uuid,
    #[serde(default)]
    pub execution_id: f64,
    #[serde(default)]
    pub experiment_key: String,
    #[serde(default, rename = "type")]
    pub step_type: String,
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub action_kind: Option<String>,
    #[serde(default)]
    pub custom_label: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub started_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_time: Option<DateTime<Utc>>,
}

/// Treats the zero timestamp some producers send as absent.
pub(crate) fn set(time: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    time.filter(|t| t.timestamp() > 0)
}

impl ExperimentExecution {
    pub fn started(&self) -> Option<DateTime<Utc>> {
        set(self.started_time)
    }

    pub fn ended(&self) -> Option<DateTime<Utc>> {
        set(self.ended_time)
    }
}

impl ExperimentStepExecution {
    pub fn started(&self) -> Option<DateTime<Utc>> {
        set(self.started_time)
    }

    pub fn ended(&self) -> Option<DateTime<Utc>> {
        set(self.ended_time)
    }

    /// Custom label, else action name, else action id.
    pub fn display_name(&self) -> &str {
        self.custom_label
            .as_deref()
            .or(self.action_name.as_deref())
            .or(self.action_id.as_deref())
            .unwrap_or_default()
    }
}
