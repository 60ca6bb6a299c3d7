use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    discovery::{ATTR_ID, ATTR_NAME},
    grafana::AlertRule,
};

pub const METRIC_NAME: &str = "alert_rule_state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warn,
    Danger,
}

impl Severity {
    /// `inactive` counts as healthy, like `normal`. Unknown states are `warn`.
    pub fn of(state: &str) -> Self {
        match state {
            "normal" | "inactive" => Severity::Success,
            "pending" => Severity::Warn,
            "firing" => Severity::Danger,
            _ => Severity::Warn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warn => "warn",
            Severity::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub name: String,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    #[serde(rename = "metric")]
    pub tags: BTreeMap<String, String>,
}

pub fn to_metric(rule_id: &str, rule: &AlertRule, now: DateTime<Utc>, base_url: &str) -> Metric {
    let search: String = url::form_urlencoded::byte_serialize(rule.name.as_bytes()).collect();

    let mut tags = BTreeMap::new();
    tags.insert(ATTR_ID.to_string(), rule_id.to_string());
    tags.insert(ATTR_NAME.to_string(), rule.name.clone());
    tags.insert("state".to_string(), Severity::of(&rule.state).as_str().to_string());
    tags.insert("tooltip".to_string(), format!("Alert rule state is: {}", rule.state));
    tags.insert(
        "url".to_string(),
        format!("{}/alerting/list?search={}", base_url.trim_end_matches('/'), search),
    );

    Metric {
        name: METRIC_NAME.to_string(),
        timestamp: now,
        value: 0.0,
        tags,
    }
}
