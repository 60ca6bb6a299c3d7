use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashSet;

use super::event::{EventRequestBody, ExperimentStepExecution};

const OMISSION: &str = "...";

pub const EXPERIMENT_CREATED_MARKER: &str = "event:experiment.execution.created";
pub const STEP_STARTED_MARKER: &str = "event:experiment.execution.step-started";

/// Tag keys an open annotation is looked up by.
const SEARCH_PREFIXES: [&str; 4] = [
    "execution_id:",
    "experiment_key:",
    "step_experiment_key:",
    "step_id:",
];

/// Cuts `value` to at most `max` characters, the last three being `...`.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let keep = max.saturating_sub(OMISSION.len());
    let mut out: String = value.chars().take(keep).collect();
    out.push_str(OMISSION);
    out
}

/// Keeps the first occurrence of every tag.
pub fn remove_duplicates(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter().filter(|tag| seen.insert(tag.clone())).collect()
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn base_tags(event: &EventRequestBody) -> Vec<String> {
    let mut tags = vec!["source:Steadybit".to_string()];
    if let Some(environment) = &event.environment {
        tags.push(format!("env:{}", truncate(&environment.name, 20)));
    }
    tags.push(format!("event:{}", truncate(&event.event_name, 50)));
    tags.push(format!("event_id:{}", event.id));
    tags.push(format!("tenant_name:{}", truncate(&event.tenant.name, 10)));
    tags.push(format!("tenant_key:{}", event.tenant.key));

    if let Some(team) = &event.team {
        tags.push(format!("team_name:{}", team.name));
        tags.push(format!("team_key:{}", team.key));
    }
    tags
}

pub fn execution_tags(event: &EventRequestBody, now: DateTime<Utc>) -> Vec<String> {
    let Some(execution) = &event.experiment_execution else {
        return Vec::new();
    };

    let mut tags = vec![
        format!("execution_id:{}", execution.execution_id),
        format!("experiment_key:{}", execution.experiment_key),
        format!("experiment_name:{}", truncate(&execution.name, 20)),
        format!("started_time:{}", rfc3339(execution.started().unwrap_or(now))),
    ];
    if let Some(ended) = execution.ended() {
        tags.push(format!("ended_time:{}", rfc3339(ended)));
    }
    tags
}

pub fn step_tags(step: &ExperimentStepExecution) -> Vec<String> {
    let mut tags = Vec::new();
    if step.step_type == "action" {
        if let Some(action_id) = &step.action_id {
            tags.push(format!("step_action_id:{}", action_id));
        }
    }
    if let Some(name) = &step.action_name {
        tags.push(format!("step_action_name:{}", truncate(name, 20)));
    }
    if let Some(label) = &step.custom_label {
        tags.push(format!("step_custom_label:{}", truncate(label, 20)));
    }
    tags.push(format!("step_execution_id:{:.0}", step.execution_id));
    tags.push(format!("step_experiment_key:{}", step.experiment_key));
    tags.push(format!("step_id:{}", step.id));
    tags
}

/// Tags identifying the annotation created when the execution or step started.
pub fn select_tags_for_search(tags: &[String]) -> Vec<String> {
    let mut search: Vec<String> = tags
        .iter()
        .filter(|tag| SEARCH_PREFIXES.iter().any(|prefix| tag.starts_with(prefix)))
        .cloned()
        .collect();

    if search.iter().any(|tag| tag.starts_with("step_experiment_key:")) {
        search.push(STEP_STARTED_MARKER.to_string());
    } else {
        search.push(EXPERIMENT_CREATED_MARKER.to_string());
    }
    remove_duplicates(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::event::{Environment, ExperimentExecution, Team, Tenant};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("Global", 20), "Global");
        assert_eq!(truncate("abcdefghijklmnopqrst", 20), "abcdefghijklmnopqrst");
    }

    #[test]
    fn truncate_ends_with_omission() {
        let out = truncate("a very long tenant name", 10);
        assert_eq!(out, "a very ...");
        assert_eq!(out.chars().count(), 10);
        assert_eq!(truncate("Überlange Umgebung Nummer eins", 20).chars().count(), 20);
    }

    #[test]
    fn duplicates_removed_in_order() {
        assert_eq!(
            remove_duplicates(strings(&["a", "b", "a", "c", "b"])),
            strings(&["a", "b", "c"])
        );
    }

    #[test]
    fn search_tags_for_experiment() {
        let tags = strings(&["execution_id:5", "experiment_key:K", "source:Steadybit", "execution_id:5"]);
        assert_eq!(
            select_tags_for_search(&tags),
            strings(&["execution_id:5", "experiment_key:K", EXPERIMENT_CREATED_MARKER])
        );
    }

    #[test]
    fn search_tags_for_step() {
        let tags = strings(&[
            "execution_id:5",
            "experiment_key:K",
            "step_execution_id:7",
            "step_experiment_key:K",
            "step_id:abc",
            "step_action_name:wait",
        ]);
        assert_eq!(
            select_tags_for_search(&tags),
            strings(&[
                "execution_id:5",
                "experiment_key:K",
                "step_experiment_key:K",
                "step_id:abc",
                STEP_STARTED_MARKER,
            ])
        );
    }

    #[test]
    fn base_and_execution_tags() {
        let started = Utc.with_ymd_and_hms(2024, 7, 18, 8, 0, 0).unwrap();
        let event = EventRequestBody {
            id: Uuid::nil(),
            event_name: "experiment.execution.created".to_string(),
            environment: Some(Environment {
                id: "e".to_string(),
                name: "Global".to_string(),
            }),
            tenant: Tenant {
                key: "demo".to_string(),
                name: "Demo Tenant Inc".to_string(),
            },
            team: Some(Team {
                id: "t".to_string(),
                key: "ADM".to_string(),
                name: "Admins".to_string(),
            }),
            experiment_execution: Some(ExperimentExecution {
                execution_id: 73983.0,
                experiment_key: "ADM-891".to_string(),
                name: "test".to_string(),
                started_time: Some(started),
                ..Default::default()
            }),
            ..Default::default()
        };

        let base = base_tags(&event);
        assert_eq!(base[0], "source:Steadybit");
        assert!(base.contains(&"env:Global".to_string()));
        assert!(base.contains(&"event:experiment.execution.created".to_string()));
        assert!(base.contains(&format!("event_id:{}", Uuid::nil())));
        assert!(base.contains(&"tenant_name:Demo Te...".to_string()));
        assert!(base.contains(&"team_key:ADM".to_string()));

        let execution = execution_tags(&event, Utc::now());
        assert_eq!(
            execution,
            strings(&[
                "execution_id:73983",
                "experiment_key:ADM-891",
                "experiment_name:test",
                "started_time:2024-07-18T08:00:00Z",
            ])
        );
    }

    #[test]
    fn step_tags_include_action_id_only_for_actions() {
        let mut step = ExperimentStepExecution {
            id: Uuid::nil(),
            execution_id: 12.0,
            experiment_key: "ADM-891".to_string(),
            step_type: "wait".to_string(),
            action_id: Some("com.example.action".to_string()),
            ..Default::default()
        };
        assert!(!step_tags(&step).iter().any(|t| t.starts_with("step_action_id:")));

        step.step_type = "action".to_string();
        let tags = step_tags(&step);
        assert!(tags.contains(&"step_action_id:com.example.action".to_string()));
        assert!(tags.contains(&"step_execution_id:12".to_string()));
        assert!(tags.contains(&"step_experiment_key:ADM-891".to_string()));
    }
}
