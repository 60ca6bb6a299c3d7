use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::{intent::AnnotationIntent, tags::select_tags_for_search};
use crate::{
    grafana::{CreateAnnotation, GrafanaApi},
    metrics::ANNOTATIONS_TOTAL,
};

pub const SEARCH_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationOutcome {
    Created { id: Option<i64> },
    Patched(i64),
    /// No open annotation matched the search tags.
    NotFound,
    /// More than one annotation matched; none was touched.
    Ambiguous(usize),
    Failed,
}

impl AnnotationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AnnotationOutcome::Created { .. } => "created",
            AnnotationOutcome::Patched(_) => "patched",
            AnnotationOutcome::NotFound => "not_found",
            AnnotationOutcome::Ambiguous(_) => "ambiguous",
            AnnotationOutcome::Failed => "failed",
        }
    }
}

/// Writes the intent to Grafana. Failures are logged, never returned.
pub async fn send_annotation(api: &dyn GrafanaApi, intent: &mut AnnotationIntent) -> AnnotationOutcome {
    debug!("Sending annotation: {:?}", intent);
    let outcome = if intent.need_patch {
        patch_existing(api, intent).await
    } else {
        create(api, intent).await
    };
    ANNOTATIONS_TOTAL.with_label_values(&[outcome.label()]).inc();
    outcome
}

async fn patch_existing(api: &dyn GrafanaApi, intent: &mut AnnotationIntent) -> AnnotationOutcome {
    let search = select_tags_for_search(&intent.tags);
    let found = match api.find_annotations(&search, SEARCH_LIMIT).await {
        Ok(found) => found,
        Err(e) => {
            error!("Failed to search annotations with tags {:?}: {}", search, e);
            return AnnotationOutcome::Failed;
        }
    };

    let annotation = match found.as_slice() {
        [annotation] => annotation,
        [] => {
            warn!("Failed to find annotation with tags {:?}", search);
            return AnnotationOutcome::NotFound;
        }
        many => {
            warn!(
                "Found {} annotations with tags {:?}, not patching any: {:?}",
                many.len(),
                search,
                many.iter().map(|a| a.id).collect::<Vec<_>>()
            );
            return AnnotationOutcome::Ambiguous(many.len());
        }
    };

    intent.id = Some(annotation.id);
    let time_end = intent
        .time_end
        .unwrap_or_else(|| Utc::now().timestamp_millis());

    match api.patch_annotation(annotation.id, time_end).await {
        Ok(_) => {
            debug!("Successfully patched annotation {}", annotation.id);
            AnnotationOutcome::Patched(annotation.id)
        }
        Err(e) => {
            error!("Failed to patch annotation {}: {}", annotation.id, e);
            AnnotationOutcome::Failed
        }
    }
}

async fn create(api: &dyn GrafanaApi, intent: &AnnotationIntent) -> AnnotationOutcome {
    let body = CreateAnnotation {
        tags: intent.tags.clone(),
        time: intent.time,
        time_end: intent.time_end,
        text: intent.text.clone().unwrap_or_default(),
    };

    match api.create_annotation(&body).await {
        Ok(response) => {
            info!("Created annotation {:?}: {}", response.id, body.text);
            AnnotationOutcome::Created { id: response.id }
        }
        Err(e) => {
            error!("Failed to post annotation {:?}: {}", body, e);
            AnnotationOutcome::Failed
        }
    }
}
