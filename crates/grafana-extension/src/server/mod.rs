mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    annotations::EventKind,
    check::AlertRuleStateCheck,
    discovery::TargetCache,
    grafana::GrafanaApi,
    Result,
};

pub use routes::StatusResponse;

pub struct Server {
    grafana: Arc<dyn GrafanaApi>,
    targets: Arc<TargetCache>,
    check: AlertRuleStateCheck,
}

impl Server {
    pub fn new(grafana: Arc<dyn GrafanaApi>, targets: Arc<TargetCache>) -> Self {
        let check = AlertRuleStateCheck::new(grafana.clone());
        Self {
            grafana,
            targets,
            check,
        }
    }

    pub fn build_router(self) -> Router {
        let state = Arc::new(self);

        Router::new()
            .route("/", get(routes::index))
            .route(routes::DISCOVERY_PATH, get(routes::discovery_description))
            .route(
                &format!("{}/target-description", routes::DISCOVERY_PATH),
                get(routes::target_description),
            )
            .route(
                &format!("{}/attribute-descriptions", routes::DISCOVERY_PATH),
                get(routes::attribute_descriptions),
            )
            .route(
                &format!("{}/discovered-targets", routes::DISCOVERY_PATH),
                get(routes::discovered_targets),
            )
            .route(routes::CHECK_PATH, get(routes::check_description))
            .route(&format!("{}/prepare", routes::CHECK_PATH), post(routes::check_prepare))
            .route(&format!("{}/start", routes::CHECK_PATH), post(routes::check_start))
            .route(&format!("{}/status", routes::CHECK_PATH), post(routes::check_status))
            .route(
                EventKind::ExperimentStarted.path(),
                post(routes::experiment_started),
            )
            .route(
                EventKind::ExperimentCompleted.path(),
                post(routes::experiment_completed),
            )
            .route(
                EventKind::ExperimentStepStarted.path(),
                post(routes::experiment_step_started),
            )
            .route(
                EventKind::ExperimentStepCompleted.path(),
                post(routes::experiment_step_completed),
            )
            .route("/metrics", get(routes::metrics))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
            .with_state(state)
    }

    pub async fn start(self, addr: &str) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, self.build_router()).await?;
        Ok(())
    }
}
