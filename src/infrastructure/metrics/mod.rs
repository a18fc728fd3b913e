//! Prometheus Metrics Module
//!
//! Provides pipeline-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Published record counts by topic
//! - Consumed record counts by topic and outcome (acked/retried/dead_lettered)
//! - Handler latency histograms
//! - Push delivery counts (delivered vs dropped)
//! - Connected push channel gauge

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Published record counter by topic and result
pub static RECORDS_PUBLISHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("records_published_total", "Total records published to the broker")
            .namespace("fanout_pipeline"),
        &["topic", "result"], // "ok", "error"
    )
    .expect("Failed to create RECORDS_PUBLISHED_TOTAL metric")
});

/// Consumed record counter by topic and delivery outcome
pub static RECORDS_CONSUMED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("records_consumed_total", "Total records consumed")
            .namespace("fanout_pipeline"),
        &["topic", "outcome"], // "acked", "retry_scheduled", "dead_lettered"
    )
    .expect("Failed to create RECORDS_CONSUMED_TOTAL metric")
});

/// Handler latency histogram
pub static HANDLER_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
    HistogramVec::new(
        HistogramOpts::new("handler_duration_seconds", "Record handler latency in seconds")
            .namespace("fanout_pipeline")
            .buckets(buckets),
        &["topic"],
    )
    .expect("Failed to create HANDLER_DURATION_SECONDS metric")
});

/// Push delivery counter
pub static PUSH_DELIVERIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("push_deliveries_total", "Outbound push delivery attempts")
            .namespace("fanout_pipeline"),
        &["result"], // "delivered", "dropped"
    )
    .expect("Failed to create PUSH_DELIVERIES_TOTAL metric")
});

/// Connected push channels gauge
pub static PUSH_CHANNELS_CONNECTED: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("push_channels_connected", "Connected per-user push channels")
            .namespace("fanout_pipeline"),
        &["state"], // "connected"
    )
    .expect("Failed to create PUSH_CHANNELS_CONNECTED metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(RECORDS_PUBLISHED_TOTAL.clone()))
        .expect("Failed to register RECORDS_PUBLISHED_TOTAL");
    registry
        .register(Box::new(RECORDS_CONSUMED_TOTAL.clone()))
        .expect("Failed to register RECORDS_CONSUMED_TOTAL");
    registry
        .register(Box::new(HANDLER_DURATION_SECONDS.clone()))
        .expect("Failed to register HANDLER_DURATION_SECONDS");
    registry
        .register(Box::new(PUSH_DELIVERIES_TOTAL.clone()))
        .expect("Failed to register PUSH_DELIVERIES_TOTAL");
    registry
        .register(Box::new(PUSH_CHANNELS_CONNECTED.clone()))
        .expect("Failed to register PUSH_CHANNELS_CONNECTED");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Metrics should be valid UTF-8")
}

/// Helper to record a publish attempt
pub fn record_publish(topic: &str, ok: bool) {
    RECORDS_PUBLISHED_TOTAL
        .with_label_values(&[topic, if ok { "ok" } else { "error" }])
        .inc();
}

/// Helper to record a consumption outcome
pub fn record_consumption(topic: &str, outcome: &str, duration_secs: f64) {
    RECORDS_CONSUMED_TOTAL
        .with_label_values(&[topic, outcome])
        .inc();
    HANDLER_DURATION_SECONDS
        .with_label_values(&[topic])
        .observe(duration_secs);
}

/// Helper to record a push delivery attempt
pub fn record_push(delivered: bool) {
    PUSH_DELIVERIES_TOTAL
        .with_label_values(&[if delivered { "delivered" } else { "dropped" }])
        .inc();
}

/// Helper to update the connected channel count
pub fn set_push_channels(connected: i64) {
    PUSH_CHANNELS_CONNECTED
        .with_label_values(&["connected"])
        .set(connected as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Force lazy initialization
        let _ = &*REGISTRY;
        let _ = &*RECORDS_PUBLISHED_TOTAL;
        let _ = &*RECORDS_CONSUMED_TOTAL;
        let _ = &*HANDLER_DURATION_SECONDS;
        let _ = &*PUSH_DELIVERIES_TOTAL;
    }

    #[test]
    fn test_gather_metrics() {
        record_publish("notification-comment", true);
        let metrics = gather_metrics();
        assert!(metrics.contains("records_published_total"));
    }
}
