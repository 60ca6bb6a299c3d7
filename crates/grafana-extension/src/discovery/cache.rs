use std::{sync::Arc, time::Duration};
use tokio::{sync::RwLock, task::JoinHandle, time::MissedTickBehavior};
use tracing::info;

use super::{AlertRuleDiscovery, Target};
use crate::metrics::{DISCOVERED_TARGETS, DISCOVERY_CYCLES_TOTAL};

/// Latest discovery snapshot. Each cycle swaps in a complete new list, so
/// readers see either the previous or the current snapshot in full.
pub struct TargetCache {
    discovery: AlertRuleDiscovery,
    targets: RwLock<Arc<Vec<Target>>>,
}

impl TargetCache {
    pub fn new(discovery: AlertRuleDiscovery) -> Self {
        Self {
            discovery,
            targets: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub async fn targets(&self) -> Arc<Vec<Target>> {
        self.targets.read().await.clone()
    }

    pub async fn refresh(&self) -> usize {
        let targets = self.discovery.discover().await;
        let count = targets.len();

        *self.targets.write().await = Arc::new(targets);

        DISCOVERY_CYCLES_TOTAL.inc();
        DISCOVERED_TARGETS.set(count as i64);
        count
    }

    pub fn interval(&self) -> Duration {
        self.discovery.interval()
    }

    /// Refreshes once right away, then on every discovery interval tick.
    pub fn spawn_refresh(self: Arc<Self>) -> JoinHandle<()> {
        let interval = self.interval();
        info!("Refreshing alert rule targets every {:?}", interval);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.refresh().await;
            }
        })
    }
}
