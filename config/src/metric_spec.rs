use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;
use strum::{
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
};

/// Statistical aggregate of a datapoint to expose.
#[derive(
    Debug, Default, Clone, Copy, AsRefStr, Display, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, Hash,
)]
pub enum Measure {
    #[default]
    Average,
    Maximum,
    Minimum,
}

impl Measure {
    /// Attribute names carrying a measure inside a datapoint.
    pub const FIELDS: [&'static str; 3] = ["Average", "Maximum", "Minimum"];

    pub fn field(&self) -> &'static str {
        match self {
            Measure::Average => "Average",
            Measure::Maximum => "Maximum",
            Measure::Minimum => "Minimum",
        }
    }
}

const fn default_period() -> u64 {
    60
}

/// One CloudMonitor metric to poll, configured under its namespace.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricSpec {
    /// Upstream metric name, e.g. `CPUUtilization`.
    pub name: String,
    /// Name used in the exported family instead of `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Aggregation period in seconds.
    #[serde(default = "default_period")]
    pub period: u64,
    #[serde(default)]
    pub measure: Measure,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rename: None,
            period: default_period(),
            measure: Measure::default(),
        }
    }

    pub fn with_rename(mut self, rename: impl Into<String>) -> Self {
        self.rename = Some(rename.into());
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measure = measure;
        self
    }

    pub fn display_name(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.name)
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period)
    }
}
