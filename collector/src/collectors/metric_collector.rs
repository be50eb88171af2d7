use crate::{
    collectors::Collector,
    formatter::MetricFormatter,
    metrics::MetricFamily,
    query::MetricQueryClient,
};
use aliyun_exporter_config::MetricSpec;
use std::{
    future::Future,
    pin::Pin,
};

/// Collects the generic metric catalog, one `DescribeMetricLast` query per metric.
pub struct MetricCollector {
    client: MetricQueryClient,
    formatter: MetricFormatter,
    catalog: Vec<(String, Vec<MetricSpec>)>,
}

impl MetricCollector {
    pub fn new(client: MetricQueryClient, formatter: MetricFormatter, catalog: Vec<(String, Vec<MetricSpec>)>) -> Self {
        Self {
            client,
            formatter,
            catalog,
        }
    }
}

impl Collector for MetricCollector {
    fn collect(&self) -> Pin<Box<dyn Future<Output = Vec<MetricFamily>> + Send + '_>> {
        Box::pin(async move {
            let mut families = Vec::new();
            for (namespace, specs) in &self.catalog {
                for spec in specs {
                    let outcome = self.client.query(namespace, &spec.name, spec.period).await;
                    families.extend(self.formatter.format(namespace, spec, outcome).await);
                }
            }
            families
        })
    }

    fn name(&self) -> &'static str {
        "MetricCollector"
    }
}
