use crate::{
    desc::NameResolver,
    error::QueryError,
    metrics::{
        format_metric_name,
        metric_up_gauge,
        MetricFamily,
    },
    namespace::{
        NamespaceRegistry,
        Strategy,
    },
    query::Datapoint,
};
use aliyun_exporter_config::{
    Measure,
    MetricSpec,
};
use serde_json::Value;
use std::sync::Arc;

/// Synthetic label holding the resolved instance name.
pub const NAME_LABEL: &str = "name";

/// Shapes the datapoints of one configured metric into a gauge family and its liveness gauge.
pub struct MetricFormatter {
    registry: Arc<NamespaceRegistry>,
    resolver: Arc<NameResolver>,
}

impl MetricFormatter {
    pub fn new(registry: Arc<NamespaceRegistry>, resolver: Arc<NameResolver>) -> Self {
        Self { registry, resolver }
    }

    /// Returns `[family, family_up=1]` for a non-empty batch, `[family_up=0]` otherwise.
    pub async fn format(
        &self,
        namespace: &str,
        spec: &MetricSpec,
        outcome: Result<Vec<Datapoint>, QueryError>,
    ) -> Vec<MetricFamily> {
        let family_name = format_metric_name(namespace, spec.display_name());
        let datapoints = match outcome {
            Ok(datapoints) if !datapoints.is_empty() => datapoints,
            Ok(_) => {
                debug!(namespace, metric = spec.name.as_str(), "No datapoints returned");
                return vec![metric_up_gauge(&family_name, false)];
            }
            Err(err) => {
                error!(error = %err, namespace, metric = spec.name.as_str(), "Error query metrics");
                return vec![metric_up_gauge(&family_name, false)];
            }
        };

        let id_key = match self.registry.strategy(namespace) {
            Strategy::Enriched { id_key } => Some(id_key),
            Strategy::Generic | Strategy::PerInstancePerformance => None,
        };
        // The resolved name replaces a `name` attribute of the datapoint.
        let point_keys = |point: &Datapoint| {
            let mut keys = label_keys(point);
            if id_key.is_some() {
                keys.retain(|key| key != NAME_LABEL);
            }
            keys
        };
        let dimensions = point_keys(&datapoints[0]);
        let mut keys = dimensions.clone();
        if id_key.is_some() {
            keys.push(NAME_LABEL.to_string());
        }
        let mut family = MetricFamily::gauge(family_name.as_str(), "", keys);

        let mut heterogeneous = false;
        for point in &datapoints {
            if !heterogeneous && point_keys(point) != dimensions {
                heterogeneous = true;
                warn!(
                    namespace,
                    metric = spec.name.as_str(),
                    expected = ?dimensions,
                    found = ?point_keys(point),
                    "Datapoints do not share one label set, missing labels are left empty"
                );
            }

            let Some(value) = measure_value(point, spec.measure) else {
                error!(
                    namespace,
                    metric = spec.name.as_str(),
                    measure = %spec.measure,
                    point = ?point,
                    "Datapoint has no numeric value for the measure, skipping it"
                );
                continue;
            };

            let mut label_values: Vec<String> = dimensions.iter().map(|key| label_value(point.get(key))).collect();
            if let Some(id_key) = id_key {
                let name = match point.get(id_key).and_then(Value::as_str) {
                    Some(id) => self.resolver.resolve(id).await,
                    None => String::new(),
                };
                label_values.push(name);
            }
            family.add_sample(label_values, value);
        }

        vec![family, metric_up_gauge(&family_name, true)]
    }
}

/// Attribute names of `point` other than the timestamp and the measures, in insertion order.
pub fn label_keys(point: &Datapoint) -> Vec<String> {
    point
        .keys()
        .filter(|key| key.as_str() != "timestamp" && !Measure::FIELDS.contains(&key.as_str()))
        .cloned()
        .collect()
}

fn measure_value(point: &Datapoint, measure: Measure) -> Option<f64> {
    point.get(measure.field()).and_then(Value::as_f64)
}

fn label_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
