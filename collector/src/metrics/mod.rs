pub mod exposition;
pub mod latency;

pub use exposition::encode_text;
pub use latency::RequestMetrics;
use serde::{
    Deserialize,
    Serialize,
};

/// Prefix of every family exported for upstream data.
pub const METRIC_PREFIX: &str = "aliyun";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MetricType {
    Gauge,
}

impl MetricType {
    pub fn metric_type_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Values aligned with the owning family's label keys.
    pub label_values: Vec<String>,
    pub value: f64,
}

/// A named set of samples sharing one label schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricFamily {
    pub name: String,
    pub help: String,
    pub metric_type: MetricType,
    pub label_keys: Vec<String>,
    pub samples: Vec<Sample>,
}

impl MetricFamily {
    pub fn gauge(name: impl Into<String>, help: impl Into<String>, label_keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            metric_type: MetricType::Gauge,
            label_keys,
            samples: Vec::new(),
        }
    }

    /// Adds a sample. Label values beyond the label keys are dropped, missing ones are filled with `""`.
    pub fn add_sample(&mut self, mut label_values: Vec<String>, value: f64) {
        label_values.resize(self.label_keys.len(), String::new());
        self.samples.push(Sample { label_values, value });
    }

    /// Looks up a sample's label value by key.
    pub fn label<'a>(&self, sample: &'a Sample, key: &str) -> Option<&'a str> {
        self.label_keys
            .iter()
            .position(|k| k == key)
            .and_then(|idx| sample.label_values.get(idx))
            .map(String::as_str)
    }
}

/// `aliyun_<namespace>_<name>`
pub fn format_metric_name(namespace: &str, name: &str) -> String {
    format!("{METRIC_PREFIX}_{namespace}_{name}")
}

/// Label-less `<resource>_up` gauge reporting whether the fetch for `resource` succeeded.
pub fn metric_up_gauge(resource: &str, succeeded: bool) -> MetricFamily {
    let mut gauge = MetricFamily::gauge(
        format!("{resource}_up"),
        format!("Did the {resource} fetch succeed."),
        Vec::new(),
    );
    gauge.add_sample(Vec::new(), if succeeded { 1.0 } else { 0.0 });
    gauge
}
