use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    event::EventRequestBody,
    tags::{base_tags, execution_tags, remove_duplicates, step_tags},
};
use crate::{Error, Result};

/// What to write to Grafana for one lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationIntent {
    pub tags: Vec<String>,
    /// Epoch milliseconds.
    pub time: i64,
    pub time_end: Option<i64>,
    pub text: Option<String>,
    /// Close an existing annotation instead of creating one.
    pub need_patch: bool,
    /// Set once the annotation to patch has been found.
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ExperimentStarted,
    ExperimentCompleted,
    ExperimentStepStarted,
    ExperimentStepCompleted,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::ExperimentStarted,
        EventKind::ExperimentCompleted,
        EventKind::ExperimentStepStarted,
        EventKind::ExperimentStepCompleted,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            EventKind::ExperimentStarted => "/events/experiment-started",
            EventKind::ExperimentCompleted => "/events/experiment-completed",
            EventKind::ExperimentStepStarted => "/events/experiment-step-started",
            EventKind::ExperimentStepCompleted => "/events/experiment-step-completed",
        }
    }

    /// Runner event names delivered to this kind's endpoint.
    pub fn listen_to(&self) -> &'static [&'static str] {
        match self {
            EventKind::ExperimentStarted => &["experiment.execution.created"],
            EventKind::ExperimentCompleted => &[
                "experiment.execution.completed",
                "experiment.execution.failed",
                "experiment.execution.canceled",
                "experiment.execution.errored",
            ],
            EventKind::ExperimentStepStarted => &["experiment.execution.step-started"],
            EventKind::ExperimentStepCompleted => &[
                "experiment.execution.step-completed",
                "experiment.execution.step-canceled",
                "experiment.execution.step-errored",
                "experiment.execution.step-failed",
            ],
        }
    }

    pub fn intent(&self, event: &EventRequestBody, now: DateTime<Utc>) -> Result<AnnotationIntent> {
        match self {
            EventKind::ExperimentStarted => on_experiment_started(event, now),
            EventKind::ExperimentCompleted => on_experiment_completed(event, now),
            EventKind::ExperimentStepStarted => on_experiment_step_started(event, now),
            EventKind::ExperimentStepCompleted => on_experiment_step_completed(event, now),
        }
    }
}

pub fn on_experiment_started(event: &EventRequestBody, now: DateTime<Utc>) -> Result<AnnotationIntent> {
    let mut tags = base_tags(event);
    tags.extend(execution_tags(event, now));

    let execution = event.experiment_execution.as_ref();
    let time = execution.and_then(|e| e.started()).unwrap_or(now);
    let text = match execution {
        Some(e) => format!("Experiment {}", e.experiment_key),
        None => "Experiment".to_string(),
    };

    Ok(AnnotationIntent {
        tags: remove_duplicates(tags),
        time: time.timestamp_millis(),
        time_end: None,
        text: Some(text),
        need_patch: false,
        id: None,
    })
}

pub fn on_experiment_step_started(event: &EventRequestBody, now: DateTime<Utc>) -> Result<AnnotationIntent> {
    let step = event
        .experiment_step_execution
        .as_ref()
        .ok_or_else(|| Error::MissingData("missing experimentStepExecution in event".to_string()))?;

    let mut tags = base_tags(event);
    tags.extend(execution_tags(event, now));
    tags.extend(step_tags(step));

    Ok(AnnotationIntent {
        tags: remove_duplicates(tags),
        time: step.started().unwrap_or(now).timestamp_millis(),
        time_end: None,
        text: Some(format!("Step {}", step.display_name())),
        need_patch: false,
        id: None,
    })
}

pub fn on_experiment_completed(event: &EventRequestBody, now: DateTime<Utc>) -> Result<AnnotationIntent> {
    let execution = event
        .experiment_execution
        .as_ref()
        .ok_or_else(|| Error::MissingData("missing experimentExecution in event".to_string()))?;

    let mut tags = base_tags(event);
    tags.extend(execution_tags(event, now));
    let tags = remove_duplicates(tags);
    debug!("Tags for completed experiment {}: {:?}", execution.experiment_key, tags);

    Ok(AnnotationIntent {
        tags,
        time: execution.started().unwrap_or(now).timestamp_millis(),
        time_end: Some(execution.ended().unwrap_or(now).timestamp_millis()),
        text: None,
        need_patch: true,
        id: None,
    })
}

pub fn on_experiment_step_completed(event: &EventRequestBody, now: DateTime<Utc>) -> Result<AnnotationIntent> {
    let step = event
        .experiment_step_execution
        .as_ref()
        .ok_or_else(|| Error::MissingData("missing experimentStepExecution in event".to_string()))?;

    let mut tags = base_tags(event);
    tags.extend(execution_tags(event, now));
    tags.extend(step_tags(step));
    let tags = remove_duplicates(tags);
    debug!("Tags for completed step {}: {:?}", step.id, tags);

    Ok(AnnotationIntent {
        tags,
        time: step.started().unwrap_or(now).timestamp_millis(),
        time_end: Some(step.ended().unwrap_or(now).timestamp_millis()),
        text: None,
        need_patch: true,
        id: None,
    })
}
