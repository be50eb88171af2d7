use std::collections::HashMap;

/// Redis namespace; its families carry a resolved instance `name` label.
pub const KVSTORE_NAMESPACE: &str = "acs_kvstore";
/// Pseudo namespace collected through the RDS per-instance performance API.
pub const RDS_PERFORMANCE_NAMESPACE: &str = "rds_performance";

/// How the metrics configured under a namespace are collected and shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// `DescribeMetricLast` datapoints, labels taken as-is.
    Generic,
    /// Like [`Strategy::Generic`] plus a `name` label looked up by the `id_key` attribute.
    Enriched { id_key: &'static str },
    /// Not queried through CloudMonitor; handled by a dedicated collector.
    PerInstancePerformance,
}

#[derive(Debug, Clone)]
pub struct NamespaceRegistry {
    strategies: HashMap<String, Strategy>,
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(KVSTORE_NAMESPACE, Strategy::Enriched { id_key: "instanceId" });
        registry.register(RDS_PERFORMANCE_NAMESPACE, Strategy::PerInstancePerformance);
        registry
    }
}

impl NamespaceRegistry {
    /// Registry where every namespace is [`Strategy::Generic`].
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn register(&mut self, namespace: impl Into<String>, strategy: Strategy) {
        self.strategies.insert(namespace.into(), strategy);
    }

    pub fn strategy(&self, namespace: &str) -> Strategy {
        self.strategies.get(namespace).copied().unwrap_or(Strategy::Generic)
    }
}
