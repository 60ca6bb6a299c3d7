//! Alert rule discovery.
//!
//! Every cycle lists the Grafana datasources, keeps those able to host alert
//! rules, fetches their grouped rules plus the rules of Grafana's own rule
//! engine, and flattens them into [`Target`]s. Any backend failure only
//! shrinks the result; a cycle always yields a list.

mod cache;
pub mod datasource;
mod targets;

pub use cache::TargetCache;
pub use targets::*;

use std::{collections::HashSet, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

use crate::{
    config::DiscoveryConfig,
    grafana::{DataSource, GrafanaApi},
};

pub struct AlertRuleDiscovery {
    api: Arc<dyn GrafanaApi>,
    host: Option<String>,
    interval: Duration,
    excludes: AttributeExcludes,
    health_check: bool,
}

impl AlertRuleDiscovery {
    pub fn new(api: Arc<dyn GrafanaApi>, config: &DiscoveryConfig) -> Self {
        Self {
            api,
            host: config.host.clone(),
            interval: config.interval,
            excludes: AttributeExcludes::new(&config.attribute_excludes),
            health_check: config.health_check,
        }
    }

    /// Period between discovery cycles.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn discover(&self) -> Vec<Target> {
        let mut targets = Vec::new();

        for datasource in self.datasources().await {
            self.collect(&datasource, &mut targets).await;
        }
        self.collect(&DataSource::builtin(), &mut targets).await;

        let targets = unique_by_id(targets);
        info!("Discovered {} alert rule targets", targets.len());
        self.excludes.apply(targets)
    }

    async fn datasources(&self) -> Vec<DataSource> {
        let all = match self.api.list_datasources().await {
            Ok(all) => all,
            Err(e) => {
                error!("Failed to retrieve datasources from Grafana: {}", e);
                return Vec::new();
            }
        };

        let compatible = datasource::compatible(all);
        debug!(
            "Alert rule compatible datasources: {:?}",
            compatible.iter().map(|d| &d.uid).collect::<Vec<_>>()
        );

        if self.health_check {
            datasource::retain_healthy(self.api.as_ref(), compatible).await
        } else {
            compatible
        }
    }

    /// Failures are logged and the datasource contributes nothing this cycle.
    async fn collect(&self, datasource: &DataSource, targets: &mut Vec<Target>) {
        let states = match self.api.alert_rules(&datasource.uid).await {
            Ok(Some(states)) => states,
            Ok(None) => {
                debug!("Datasource {} has no alert rules endpoint", datasource.uid);
                return;
            }
            Err(e) => {
                warn!(
                    "Failed to retrieve alert rules for datasource {}: {}",
                    datasource.display_name(),
                    e
                );
                return;
            }
        };

        for group in &states.data.groups {
            for rule in &group.rules {
                targets.push(to_target(self.host.as_deref(), datasource, &group.name, rule));
            }
        }
    }
}

/// Keeps the first target per id. Rules sharing a name within one group, or
/// groups sharing a name, would otherwise yield the same id twice.
fn unique_by_id(targets: Vec<Target>) -> Vec<Target> {
    let mut seen = HashSet::new();
    targets
        .into_iter()
        .filter(|target| {
            let first = seen.insert(target.id.clone());
            if !first {
                warn!("Skipping alert rule with duplicate target id {}", target.id);
            }
            first
        })
        .collect()
}
