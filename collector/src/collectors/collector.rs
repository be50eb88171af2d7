use crate::metrics::MetricFamily;
use std::{
    future::Future,
    pin::Pin,
};

/// Trait for producing metric families on every scrape
pub trait Collector: Send + Sync {
    /// Collect the current families. Failures are reported through liveness gauges or omitted samples, never as
    /// an error for the whole collector.
    fn collect(&self) -> Pin<Box<dyn Future<Output = Vec<MetricFamily>> + Send + '_>>;

    /// Get the name of this collector
    fn name(&self) -> &'static str;
}
