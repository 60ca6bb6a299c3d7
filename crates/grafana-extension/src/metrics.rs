use lazy_static::lazy_static;
use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref DISCOVERY_CYCLES_TOTAL: IntCounter = register_int_counter_with_registry!(
        "grafana_extension_discovery_cycles_total",
        "Total number of alert rule discovery cycles.",
        REGISTRY
    )
    .unwrap();
    pub static ref DISCOVERED_TARGETS: IntGauge = register_int_gauge_with_registry!(
        "grafana_extension_discovered_targets",
        "Alert rule targets found by the latest discovery cycle.",
        REGISTRY
    )
    .unwrap();
    pub static ref ANNOTATIONS_TOTAL: IntCounterVec = register_int_counter_vec_with_registry!(
        "grafana_extension_annotations_total",
        "Annotation writes by outcome.",
        &["outcome"],
        REGISTRY
    )
    .unwrap();
}

// Function to gather metrics for exposition
pub fn gather_metrics() -> crate::Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to encode metrics: {}", e)))?;
    String::from_utf8(buffer)
        .map_err(|e| crate::Error::Internal(format!("Failed to convert metrics to string: {}", e)))
}
