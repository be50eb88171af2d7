use crate::{
    api::{
        CloudApi,
        HttpTransport,
        RpcTransport,
    },
    collectors::{
        Collector,
        InfoCollector,
        MetricCollector,
        PerformanceCollector,
    },
    desc::NameResolver,
    formatter::MetricFormatter,
    inventory::InventoryProvider,
    metrics::{
        MetricFamily,
        RequestMetrics,
    },
    namespace::{
        NamespaceRegistry,
        Strategy,
    },
    query::MetricQueryClient,
    rate_limiter::RateLimiter,
};
use aliyun_exporter_config::Config;
use eyre::Result;
use prometheus::Registry;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

/// Owns the shared upstream plumbing and runs every collector once per scrape
pub struct Orchestrator {
    collectors: Vec<Box<dyn Collector>>,
}

impl Orchestrator {
    /// Create an orchestrator talking to Alibaba Cloud over HTTPS, registering its request latency metrics in
    /// `registry`
    pub fn new(config: &Config, registry: &Registry) -> Result<Self> {
        let transport = HttpTransport::new(&config.credential, &config.http)?;
        let metrics = RequestMetrics::new(registry)?;
        Ok(Self::with_transport(config, Arc::new(transport), metrics))
    }

    pub fn with_transport(config: &Config, transport: Arc<dyn RpcTransport>, metrics: RequestMetrics) -> Self {
        let api = CloudApi::new(transport, Arc::new(RateLimiter::new(config.rate_limit)));
        let namespaces = Arc::new(NamespaceRegistry::default());
        let resolver = Arc::new(NameResolver::new(api.clone(), &config.name_cache));
        let inventory = Arc::new(InventoryProvider::new(api.clone()));
        let regions = config.info_regions();

        let mut generic = Vec::new();
        let mut special: Vec<Box<dyn Collector>> = Vec::new();
        for (namespace, specs) in &config.metrics {
            match namespaces.strategy(namespace) {
                Strategy::Generic | Strategy::Enriched { .. } => generic.push((namespace.clone(), specs.clone())),
                Strategy::PerInstancePerformance => {
                    let keys: Vec<String> = specs.iter().map(|spec| spec.name.clone()).collect();
                    special.push(Box::new(PerformanceCollector::new(
                        api.clone(),
                        inventory.clone(),
                        &keys,
                        regions.clone(),
                    )));
                }
            }
        }

        let mut collectors: Vec<Box<dyn Collector>> = vec![Box::new(MetricCollector::new(
            MetricQueryClient::new(api, metrics, &config.retry),
            MetricFormatter::new(namespaces, resolver),
            generic,
        ))];
        if let Some(resources) = config.info_metrics.as_ref().filter(|resources| !resources.is_empty()) {
            collectors.push(Box::new(InfoCollector::new(inventory, resources.clone(), regions)));
        }
        collectors.extend(special);

        info!(
            collectors = ?collectors.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "Collectors initialized"
        );
        Self { collectors }
    }
}

impl Collector for Orchestrator {
    fn collect(&self) -> Pin<Box<dyn Future<Output = Vec<MetricFamily>> + Send + '_>> {
        Box::pin(async move {
            let mut families = Vec::new();
            for collector in &self.collectors {
                let collected = collector.collect().await;
                debug!(collector = collector.name(), families = collected.len(), "Collected");
                families.extend(collected);
            }
            families
        })
    }

    fn name(&self) -> &'static str {
        "Orchestrator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::FakeTransport,
        metrics::encode_text,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CONFIG: &str = r#"
credential:
  access_key_id: id
  access_key_secret: secret
  region_id: cn-hangzhou
metrics:
  acs_ecs_dashboard:
    - name: CPUUtilization
    - name: memory_usedutilization
  rds_performance:
    - name: MySQL_NetworkTraffic
info_metrics:
  - rds
"#;

    fn upstream() -> FakeTransport {
        FakeTransport::new(|request| {
            let body = match (request.action, request.get("MetricName")) {
                ("DescribeMetricLast", Some("CPUUtilization")) => json!({
                    "Datapoints": r#"[{"timestamp":1,"instanceId":"i-1","Average":42.5}]"#,
                }),
                ("DescribeMetricLast", _) => json!({}),
                ("DescribeDBInstances", _) => json!({"Items": {"DBInstance": [{"DBInstanceId": "rm-1"}]}}),
                ("DescribeDBInstancePerformance", _) => json!({
                    "PerformanceKeys": {"PerformanceKey": [{
                        "Key": "MySQL_NetworkTraffic",
                        "ValueFormat": "recv_k&sent_k",
                        "Values": {"PerformanceValue": [{"Value": "1.0&2.0"}]},
                    }]},
                }),
                (action, _) => panic!("unexpected {action} call"),
            };
            Ok(body.to_string())
        })
    }

    #[tokio::test]
    async fn collects_generic_then_info_then_performance() {
        let config = Config::from_yaml(CONFIG, |_| None).unwrap();
        let transport = Arc::new(upstream());
        let orchestrator =
            Orchestrator::with_transport(&config, transport.clone(), RequestMetrics::unregistered().unwrap());

        let families = orchestrator.collect().await;

        let names: Vec<_> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "aliyun_acs_ecs_dashboard_CPUUtilization",
                "aliyun_acs_ecs_dashboard_CPUUtilization_up",
                "aliyun_acs_ecs_dashboard_memory_usedutilization_up",
                "aliyun_meta_rds_info",
                "aliyun_rds_performance_MySQL_NetworkTraffic_recv_k",
                "aliyun_rds_performance_MySQL_NetworkTraffic_sent_k",
            ]
        );
        assert_eq!(transport.count("DescribeMetricLast"), 2);

        let text = encode_text(&families);
        assert!(text.contains("aliyun_acs_ecs_dashboard_CPUUtilization{instanceId=\"i-1\"} 42.5\n"));
        assert!(text.contains("aliyun_acs_ecs_dashboard_memory_usedutilization_up 0\n"));
        assert!(text.contains("aliyun_rds_performance_MySQL_NetworkTraffic_sent_k{instanceId=\"rm-1\"} 2\n"));
    }
}
