//! # Aliyun Exporter Collector
//!
//! Turns Alibaba Cloud CloudMonitor data into Prometheus metric families, one collection cycle per scrape.
//!
//! ## Architecture
//!
//! - **`api`**: Signed, rate limited RPC calls to the Alibaba Cloud endpoints
//! - **`query`**: `DescribeMetricLast` with bounded retries and request latency histograms
//! - **`desc`**: Instance id to name lookup with a time-expiring cache
//! - **`formatter`**: Datapoints to a labeled gauge family plus its `_up` liveness gauge
//! - **`inventory`**: Resource listings as `aliyun_meta_<resource>_info` families
//! - **`collectors`**: Self-contained collectors and the `Orchestrator` that wires and runs them
//! - **`metrics`**: Metric family model and the Prometheus text exposition
//!
//! ## Usage
//!
//! ```ignore
//! let registry = prometheus::Registry::new();
//! let orchestrator = Orchestrator::new(&config, &registry)?;
//! let body = encode_text(&orchestrator.collect().await);
//! ```

#[macro_use]
extern crate tracing;

pub mod api;
pub mod cache;
pub mod collectors;
pub mod desc;
pub mod error;
pub mod formatter;
pub mod inventory;
pub mod metrics;
pub mod namespace;
pub mod query;
pub mod rate_limiter;

pub use collectors::*;
pub use error::{
    ApiError,
    QueryError,
};
pub use metrics::*;
