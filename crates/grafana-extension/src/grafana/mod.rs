//! Access to the Grafana HTTP API.
//!
//! Everything the extension reads or writes on the backend goes through
//! [`GrafanaApi`], so discovery, checks and annotations can be exercised
//! against a mock.

mod client;
mod models;

pub use client::GrafanaClient;
pub use models::*;

use async_trait::async_trait;

use crate::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GrafanaApi: Send + Sync {
    /// Base URL of the API, used to build deep links.
    fn base_url(&self) -> String;

    async fn list_datasources(&self) -> Result<Vec<DataSource>>;

    /// `Ok(())` when the datasource reports itself healthy.
    async fn datasource_health(&self, id: i64) -> Result<()>;

    /// Grouped alert rules of a datasource. `None` when the backend answers 404.
    async fn alert_rules(&self, datasource_uid: &str) -> Result<Option<AlertsStates>>;

    async fn find_annotations(&self, tags: &[String], limit: usize) -> Result<Vec<Annotation>>;

    async fn create_annotation(&self, body: &CreateAnnotation) -> Result<AnnotationResponse>;

    async fn patch_annotation(&self, id: i64, time_end: i64) -> Result<AnnotationResponse>;
}
