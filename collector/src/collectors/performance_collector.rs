use crate::{
    api::CloudApi,
    collectors::Collector,
    inventory::InventoryProvider,
    metrics::{
        format_metric_name,
        MetricFamily,
    },
    namespace::RDS_PERFORMANCE_NAMESPACE,
};
use aliyun_exporter_config::ResourceKind;
use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use serde_json::Value;
use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
};

const WINDOW_FORMAT: &str = "%Y-%m-%dT%H:%MZ";
const COMPONENT_SEPARATOR: char = '&';

/// Collects `DescribeDBInstancePerformance` values for every RDS instance of the configured regions.
pub struct PerformanceCollector {
    api: CloudApi,
    inventory: Arc<InventoryProvider>,
    keys: String,
    regions: Vec<String>,
}

impl PerformanceCollector {
    pub fn new(api: CloudApi, inventory: Arc<InventoryProvider>, keys: &[String], regions: Vec<String>) -> Self {
        Self {
            api,
            inventory,
            keys: keys.join(","),
            regions,
        }
    }

    async fn collect_instance(&self, region_id: &str, instance_id: &str) -> Vec<MetricFamily> {
        let (start_time, end_time) = performance_window(Utc::now());
        let response = match self
            .api
            .describe_instance_performance(region_id, instance_id, &self.keys, &start_time, &end_time)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(error = %err, instance_id, "Error request rds performance api");
                return Vec::new();
            }
        };

        response
            .pointer("/PerformanceKeys/PerformanceKey")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().flat_map(|key| explode(instance_id, key)).collect())
            .unwrap_or_default()
    }
}

impl Collector for PerformanceCollector {
    fn collect(&self) -> Pin<Box<dyn Future<Output = Vec<MetricFamily>> + Send + '_>> {
        Box::pin(async move {
            let mut families = Vec::new();
            for region_id in &self.regions {
                let instance_ids = match self.inventory.instance_ids(ResourceKind::Rds, region_id).await {
                    Ok(ids) => ids,
                    Err(err) => {
                        error!(error = %err, %region_id, "Error listing rds instances");
                        continue;
                    }
                };
                for instance_id in &instance_ids {
                    families.extend(self.collect_instance(region_id, instance_id).await);
                }
            }
            families
        })
    }

    fn name(&self) -> &'static str {
        "PerformanceCollector"
    }
}

/// The trailing one minute window ending at `now`, minute precision.
pub fn performance_window(now: DateTime<Utc>) -> (String, String) {
    let start = now - TimeDelta::minutes(1);
    (
        start.format(WINDOW_FORMAT).to_string(),
        now.format(WINDOW_FORMAT).to_string(),
    )
}

/// Turns one `PerformanceKey` into a gauge per value component.
///
/// `ValueFormat` names the components of the `&` joined value, e.g. `recv_k&sent_k`. Keys whose value does not
/// match its format are dropped as a whole.
pub fn explode(instance_id: &str, key: &Value) -> Vec<MetricFamily> {
    let Some(metric_key) = key.get("Key").and_then(Value::as_str) else {
        error!(instance_id, %key, "Performance key has no name");
        return Vec::new();
    };
    let components: Vec<&str> = match key.get("ValueFormat").and_then(Value::as_str) {
        Some(format) if format.contains(COMPONENT_SEPARATOR) => format.split(COMPONENT_SEPARATOR).collect(),
        _ => vec!["value"],
    };
    let Some(raw) = key.pointer("/Values/PerformanceValue/0/Value").and_then(Value::as_str) else {
        debug!(instance_id, metric_key, "No performance values returned");
        return Vec::new();
    };

    let parts: Vec<&str> = raw.split(COMPONENT_SEPARATOR).collect();
    if parts.len() != components.len() {
        error!(
            instance_id,
            metric_key,
            raw,
            expected = components.len(),
            "Performance value does not match its format"
        );
        return Vec::new();
    }
    let values = match parts.iter().map(|part| part.trim().parse::<f64>()).collect::<Result<Vec<_>, _>>() {
        Ok(values) => values,
        Err(err) => {
            error!(error = %err, instance_id, metric_key, raw, "Performance value is not numeric");
            return Vec::new();
        }
    };

    components
        .iter()
        .zip(values)
        .map(|(component, value)| {
            let mut gauge = MetricFamily::gauge(
                format_metric_name(RDS_PERFORMANCE_NAMESPACE, &format!("{metric_key}_{component}")),
                "",
                vec!["instanceId".to_string()],
            );
            gauge.add_sample(vec![instance_id.to_string()], value);
            gauge
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::{
            unavailable,
            FakeTransport,
        },
        metrics::Sample,
        rate_limiter::RateLimiter,
    };
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn values(families: &[MetricFamily]) -> Vec<(&str, &Sample)> {
        families
            .iter()
            .flat_map(|f| f.samples.iter().map(move |s| (f.name.as_str(), s)))
            .collect()
    }

    #[test]
    fn explodes_composite_values() {
        let key = json!({
            "Key": "MySQL_NetworkTraffic",
            "ValueFormat": "min&max",
            "Values": {"PerformanceValue": [{"Value": "1.0&2.0", "Date": "2024-01-01T00:00:00Z"}]},
        });

        let families = explode("rm-1", &key);

        let expected_sample = |value| Sample {
            label_values: vec!["rm-1".to_string()],
            value,
        };
        assert_eq!(
            values(&families),
            vec![
                ("aliyun_rds_performance_MySQL_NetworkTraffic_min", &expected_sample(1.0)),
                ("aliyun_rds_performance_MySQL_NetworkTraffic_max", &expected_sample(2.0)),
            ]
        );
        assert_eq!(families[0].label_keys, vec!["instanceId".to_string()]);
    }

    #[test]
    fn single_value_is_named_value() {
        let key = json!({
            "Key": "MySQL_Sessions",
            "ValueFormat": "active_session",
            "Values": {"PerformanceValue": [{"Value": "12"}, {"Value": "13"}]},
        });

        let families = explode("rm-1", &key);

        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "aliyun_rds_performance_MySQL_Sessions_value");
        assert_eq!(families[0].samples[0].value, 12.0);
    }

    #[test]
    fn mismatched_or_unparsable_values_are_dropped() {
        let mismatched = json!({
            "Key": "MySQL_QPSTPS",
            "ValueFormat": "QPS&TPS",
            "Values": {"PerformanceValue": [{"Value": "1.0"}]},
        });
        let unparsable = json!({
            "Key": "MySQL_QPSTPS",
            "ValueFormat": "QPS&TPS",
            "Values": {"PerformanceValue": [{"Value": "1.0&n/a"}]},
        });
        let empty = json!({"Key": "MySQL_QPSTPS", "ValueFormat": "QPS&TPS", "Values": {"PerformanceValue": []}});

        assert!(explode("rm-1", &mismatched).is_empty());
        assert!(explode("rm-1", &unparsable).is_empty());
        assert!(explode("rm-1", &empty).is_empty());
    }

    #[test]
    fn window_is_the_previous_minute() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 42).unwrap();
        assert_eq!(
            performance_window(now),
            ("2024-02-29T23:59Z".to_string(), "2024-03-01T00:00Z".to_string())
        );
    }

    #[tokio::test]
    async fn queries_every_instance_and_skips_failures() {
        let transport = Arc::new(FakeTransport::new(|request| match request.action {
            "DescribeDBInstances" => Ok(json!({"Items": {"DBInstance": [
                {"DBInstanceId": "rm-1"},
                {"DBInstanceId": "rm-2"},
            ]}})
            .to_string()),
            "DescribeDBInstancePerformance" if request.get("DBInstanceId") == Some("rm-1") => Ok(json!({
                "PerformanceKeys": {"PerformanceKey": [{
                    "Key": "MySQL_MemCpuUsage",
                    "ValueFormat": "cpuusage&memusage",
                    "Values": {"PerformanceValue": [{"Value": "3.5&40.1"}]},
                }]},
            })
            .to_string()),
            _ => Err(unavailable()),
        }));
        let api = CloudApi::new(transport.clone(), Arc::new(RateLimiter::new(1000)));
        let collector = PerformanceCollector::new(
            api.clone(),
            Arc::new(InventoryProvider::new(api)),
            &["MySQL_MemCpuUsage".to_string(), "MySQL_IOPS".to_string()],
            vec!["cn-hangzhou".to_string()],
        );

        let families = collector.collect().await;

        let names: Vec<_> = families.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "aliyun_rds_performance_MySQL_MemCpuUsage_cpuusage",
                "aliyun_rds_performance_MySQL_MemCpuUsage_memusage",
            ]
        );
        let requests = transport.calls();
        let performance: Vec<_> = requests
            .iter()
            .filter(|r| r.action == "DescribeDBInstancePerformance")
            .collect();
        assert_eq!(performance.len(), 2);
        assert_eq!(performance[0].get("Key"), Some("MySQL_MemCpuUsage,MySQL_IOPS"));
        assert_eq!(performance[0].region_id.as_deref(), Some("cn-hangzhou"));
    }

    #[tokio::test]
    async fn failed_region_listing_skips_only_that_region() {
        let transport = Arc::new(FakeTransport::new(|request| {
            match (request.action, request.region_id.as_deref()) {
                ("DescribeDBInstances", Some("cn-hangzhou")) => Err(unavailable()),
                ("DescribeDBInstances", _) => Ok(json!({"Items": {"DBInstance": [{"DBInstanceId": "rm-b"}]}}).to_string()),
                ("DescribeDBInstancePerformance", _) => Ok(json!({
                    "PerformanceKeys": {"PerformanceKey": [{
                        "Key": "MySQL_Sessions",
                        "ValueFormat": "active_session",
                        "Values": {"PerformanceValue": [{"Value": "7"}]},
                    }]},
                })
                .to_string()),
                _ => Err(unavailable()),
            }
        }));
        let api = CloudApi::new(transport.clone(), Arc::new(RateLimiter::new(1000)));
        let collector = PerformanceCollector::new(
            api.clone(),
            Arc::new(InventoryProvider::new(api)),
            &["MySQL_Sessions".to_string()],
            vec!["cn-hangzhou".to_string(), "cn-beijing".to_string()],
        );

        let families = collector.collect().await;

        let expected_sample = Sample {
            label_values: vec!["rm-b".to_string()],
            value: 7.0,
        };
        assert_eq!(
            values(&families),
            vec![("aliyun_rds_performance_MySQL_Sessions_value", &expected_sample)]
        );
        assert_eq!(transport.count("DescribeDBInstances"), 2);
        let performance: Vec<_> = transport
            .calls()
            .into_iter()
            .filter(|r| r.action == "DescribeDBInstancePerformance")
            .collect();
        assert_eq!(performance.len(), 1);
        assert_eq!(performance[0].region_id.as_deref(), Some("cn-beijing"));
    }
}
