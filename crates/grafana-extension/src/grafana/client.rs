use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, trace};

use super::{AlertsStates, Annotation, AnnotationResponse, CreateAnnotation, DataSource, GrafanaApi};
use crate::{config::GrafanaConfig, Error, Result};

/// Grafana API client. Base URL and auth header are fixed at construction.
#[derive(Debug, Clone)]
pub struct GrafanaClient {
    base_url: String,
    client: Client,
}

impl GrafanaClient {
    pub fn new(config: &GrafanaConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if !config.service_token.is_empty() {
            let value = HeaderValue::from_str(&format!("Bearer {}", config.service_token))
                .map_err(|e| Error::Config(format!("Invalid service token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        let response = Self::ensure_success(path, response).await?;
        let body = response.text().await?;
        trace!("Grafana response for {}: {}", path, body);
        Ok(serde_json::from_str(&body)?)
    }

    /// Like `decode`, but an empty success body yields the default value.
    async fn decode_or_default<T: DeserializeOwned + Default>(path: &str, response: Response) -> Result<T> {
        let response = Self::ensure_success(path, response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(T::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn ensure_success(path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Backend {
            status: status.as_u16(),
            path: path.to_string(),
            body,
        })
    }
}

#[async_trait]
impl GrafanaApi for GrafanaClient {
    fn base_url(&self) -> String {
        self.base_url.clone()
    }

    async fn list_datasources(&self) -> Result<Vec<DataSource>> {
        let path = "/api/datasources";
        let response = self.client.get(self.url(path)).send().await?;
        Self::decode(path, response).await
    }

    async fn datasource_health(&self, id: i64) -> Result<()> {
        let path = format!("/api/datasources/{}/health", id);
        let response = self.client.get(self.url(&path)).send().await?;
        Self::ensure_success(&path, response).await?;
        Ok(())
    }

    async fn alert_rules(&self, datasource_uid: &str) -> Result<Option<AlertsStates>> {
        let path = format!("/api/prometheus/{}/api/v1/rules", datasource_uid);
        let response = self.client.get(self.url(&path)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!("No alert rules endpoint for datasource {}", datasource_uid);
            return Ok(None);
        }
        Self::decode(&path, response).await.map(Some)
    }

    async fn find_annotations(&self, tags: &[String], limit: usize) -> Result<Vec<Annotation>> {
        let path = "/api/annotations";
        let mut query: Vec<(&str, String)> = tags.iter().map(|t| ("tags", t.clone())).collect();
        query.push(("limit", limit.to_string()));

        let response = self.client.get(self.url(path)).query(&query).send().await?;
        Self::decode(path, response).await
    }

    async fn create_annotation(&self, body: &CreateAnnotation) -> Result<AnnotationResponse> {
        let path = "/api/annotations";
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode_or_default(path, response).await
    }

    async fn patch_annotation(&self, id: i64, time_end: i64) -> Result<AnnotationResponse> {
        let path = format!("/api/annotations/{}", id);
        let response = self
            .client
            .patch(self.url(&path))
            .json(&json!({ "timeEnd": time_end }))
            .send()
            .await?;
        Self::decode_or_default(&path, response).await
    }
}
