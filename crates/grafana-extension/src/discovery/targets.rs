use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::{
    grafana::{AlertRule, DataSource},
    TARGET_TYPE,
};

pub const ATTR_ID: &str = "grafana.alert-rule.id";
pub const ATTR_NAME: &str = "grafana.alert-rule.name";
pub const ATTR_GROUP: &str = "grafana.alert-rule.group";
pub const ATTR_DATASOURCE: &str = "grafana.alert-rule.datasource";
pub const ATTR_DATASOURCE_UID: &str = "grafana.alert-rule.datasource-uid";
pub const ATTR_HEALTH: &str = "grafana.alert-rule.health";
pub const ATTR_STATE: &str = "grafana.alert-rule.state";
pub const ATTR_TYPE: &str = "grafana.alert-rule.type";
pub const ATTR_LAST_EVALUATION: &str = "grafana.alert-rule.last-evaluation";
pub const ATTR_HOST: &str = "grafana.host";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    pub target_type: String,
    pub label: String,
    pub attributes: BTreeMap<String, Vec<String>>,
}

/// `{host}-{datasource}-{group}-{rule}`, or without the host part when unknown.
pub fn target_id(host: Option<&str>, datasource: &str, group: &str, rule: &str) -> String {
    match host {
        Some(host) => format!("{}-{}-{}-{}", host, datasource, group, rule),
        None => format!("{}-{}-{}", datasource, group, rule),
    }
}

pub fn to_target(host: Option<&str>, datasource: &DataSource, group: &str, rule: &AlertRule) -> Target {
    let id = target_id(host, datasource.display_name(), group, &rule.name);

    let mut attributes = BTreeMap::new();
    let mut put = |key: &str, value: &str| {
        attributes.insert(key.to_string(), vec![value.to_string()]);
    };
    put(ATTR_ID, &id);
    put(ATTR_NAME, &rule.name);
    put(ATTR_GROUP, group);
    put(ATTR_DATASOURCE, datasource.display_name());
    put(ATTR_DATASOURCE_UID, &datasource.uid);
    put(ATTR_HEALTH, &rule.health);
    put(ATTR_STATE, &rule.state);
    put(ATTR_TYPE, &rule.rule_type);
    if let Some(last) = rule.last_evaluation {
        put(ATTR_LAST_EVALUATION, &format_evaluation(last));
    }
    if let Some(host) = host {
        put(ATTR_HOST, host);
    }

    Target {
        id,
        target_type: TARGET_TYPE.to_string(),
        label: rule.name.clone(),
        attributes,
    }
}

fn format_evaluation(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Attribute-exclusion patterns. `*` matches any run of characters.
#[derive(Debug, Clone, Default)]
pub struct AttributeExcludes {
    patterns: Vec<Regex>,
}

impl AttributeExcludes {
    pub fn new(patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|pattern| {
                let source = format!("^{}$", regex::escape(pattern).replace(r"\*", ".*"));
                match Regex::new(&source) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        warn!("Ignoring invalid attribute exclude '{}': {}", pattern, e);
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn is_excluded(&self, key: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(key))
    }

    pub fn apply(&self, targets: Vec<Target>) -> Vec<Target> {
        if self.patterns.is_empty() {
            return targets;
        }
        targets
            .into_iter()
            .map(|mut target| {
                target.attributes.retain(|key, _| !self.is_excluded(key));
                target
            })
            .collect()
    }
}
