//! # Collectors Module
//!
//! Everything that runs during one collection cycle.
//!
//! ## Architecture
//!
//! - **`Collector` trait**: Defines the interface for all collectors
//! - **`MetricCollector`**: Queries `DescribeMetricLast` for every generic metric and formats the datapoints
//! - **`InfoCollector`**: Emits `aliyun_meta_<resource>_info` families from resource listings
//! - **`PerformanceCollector`**: Explodes RDS per-instance performance values into gauges
//! - **`Orchestrator`**: Builds the collectors from the configuration and runs them in order

pub mod collector;
pub mod info_collector;
pub mod metric_collector;
pub mod orchestrator;
pub mod performance_collector;

pub use collector::Collector;
pub use info_collector::InfoCollector;
pub use metric_collector::MetricCollector;
pub use orchestrator::Orchestrator;
pub use performance_collector::PerformanceCollector;
