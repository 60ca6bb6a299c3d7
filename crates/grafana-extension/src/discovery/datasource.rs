use futures::future::join_all;
use tracing::warn;

use crate::grafana::{DataSource, GrafanaApi};

/// Datasource types able to host alert rules.
/// See https://grafana.com/docs/grafana/latest/alerting/fundamentals/alert-rules/#data-source-managed-alert-rules
const ALERT_RULE_COMPATIBLE_TYPES: [&str; 2] = ["prometheus", "loki"];

pub fn is_alert_rule_compatible(datasource: &DataSource) -> bool {
    ALERT_RULE_COMPATIBLE_TYPES.contains(&datasource.ds_type.as_str())
}

pub fn compatible(datasources: Vec<DataSource>) -> Vec<DataSource> {
    datasources
        .into_iter()
        .filter(is_alert_rule_compatible)
        .collect()
}

/// A failed health check counts as unhealthy; it is logged and never retried.
pub async fn healthy(api: &dyn GrafanaApi, datasource: &DataSource) -> bool {
    match api.datasource_health(datasource.id).await {
        Ok(()) => true,
        Err(e) => {
            warn!(
                "Datasource {} ({}) failed its health check, skipping it this cycle: {}",
                datasource.display_name(),
                datasource.uid,
                e
            );
            false
        }
    }
}

/// Probes all datasources concurrently and keeps the healthy ones, in order.
pub async fn retain_healthy(api: &dyn GrafanaApi, datasources: Vec<DataSource>) -> Vec<DataSource> {
    let results = join_all(datasources.iter().map(|ds| healthy(api, ds))).await;
    datasources
        .into_iter()
        .zip(results)
        .filter_map(|(ds, ok)| ok.then_some(ds))
        .collect()
}
