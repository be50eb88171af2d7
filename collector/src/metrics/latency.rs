use prometheus::{
    HistogramOpts,
    HistogramVec,
    Registry,
};
use std::time::Duration;

/// Latency of CloudMonitor metric queries, partitioned by namespace.
#[derive(Clone)]
pub struct RequestMetrics {
    request_latency: HistogramVec,
    failed_request_latency: HistogramVec,
}

impl RequestMetrics {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let request_latency = HistogramVec::new(
            HistogramOpts::new("cloudmonitor_request_latency_seconds", "CloudMonitor request latency"),
            &["project"],
        )?;
        registry.register(Box::new(request_latency.clone()))?;

        let failed_request_latency = HistogramVec::new(
            HistogramOpts::new(
                "cloudmonitor_failed_request_latency_seconds",
                "CloudMonitor failed request latency",
            ),
            &["project"],
        )?;
        registry.register(Box::new(failed_request_latency.clone()))?;

        Ok(Self {
            request_latency,
            failed_request_latency,
        })
    }

    /// Metrics that are not registered anywhere.
    pub fn unregistered() -> prometheus::Result<Self> {
        Self::new(&Registry::new())
    }

    pub fn observe_success(&self, namespace: &str, elapsed: Duration) {
        self.request_latency
            .with_label_values(&[namespace])
            .observe(elapsed.as_secs_f64());
    }

    pub fn observe_failure(&self, namespace: &str, elapsed: Duration) {
        self.failed_request_latency
            .with_label_values(&[namespace])
            .observe(elapsed.as_secs_f64());
    }

    pub fn success_count(&self, namespace: &str) -> u64 {
        self.request_latency.with_label_values(&[namespace]).get_sample_count()
    }

    pub fn failure_count(&self, namespace: &str) -> u64 {
        self.failed_request_latency
            .with_label_values(&[namespace])
            .get_sample_count()
    }
}
