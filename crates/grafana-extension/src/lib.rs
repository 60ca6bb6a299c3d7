pub mod annotations;
pub mod check;
pub mod config;
pub mod discovery;
pub mod grafana;
pub mod metrics;
pub mod server;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Target type shared by the discovery and the state check.
pub const TARGET_TYPE: &str = "com.steadybit.extension_grafana.alert-rule";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Alert rule '{rule}' not found for datasource '{datasource}'")]
    RuleNotFound { rule: String, datasource: String },
    #[error("Missing data: {0}")]
    MissingData(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Grafana responded with status {status} for {path}: {body}")]
    Backend {
        status: u16,
        path: String,
        body: String,
    },
    #[error("JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error body understood by the extension callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::MissingData(_) | Error::SerdeJson(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn title(&self) -> String {
        match self {
            Error::Config(msg) | Error::MissingData(msg) => msg.clone(),
            Error::SerdeJson(_) => "Failed to decode request body".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = ErrorBody {
            title: self.title(),
            detail: Some(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
