//! Experiment annotations.
//!
//! Started events create an annotation on Grafana; the matching completed
//! event later finds that annotation by a subset of its tags and patches its
//! end time. Annotation writes are best effort: their failures never reach the
//! event producer.

mod dispatch;
pub mod event;
mod intent;
pub mod tags;

pub use dispatch::{send_annotation, AnnotationOutcome, SEARCH_LIMIT};
pub use event::EventRequestBody;
pub use intent::*;

use chrono::Utc;

use crate::{grafana::GrafanaApi, Result};

/// Maps the event to an annotation write and performs it. Only an event
/// lacking required data is an error.
pub async fn handle_event(
    api: &dyn GrafanaApi,
    kind: EventKind,
    event: &EventRequestBody,
) -> Result<AnnotationOutcome> {
    let mut intent = kind.intent(event, Utc::now())?;
    Ok(send_annotation(api, &mut intent).await)
}
