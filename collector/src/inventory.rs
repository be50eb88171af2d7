//! Resource listings exported as `aliyun_meta_<resource>_info` families.
//!
//! Every [`ResourceKind`] maps to a product list action. The listing is paginated until a short page comes back,
//! and each instance becomes one sample with value `1` labeled by its scalar attributes. A few well known nested
//! attributes (the ECS IP address wrappers) are flattened to their first address.

use crate::{
    api::{
        CloudApi,
        RpcRequest,
    },
    error::ApiError,
    metrics::{
        exposition::sanitize_label_name,
        MetricFamily,
        METRIC_PREFIX,
    },
};
use aliyun_exporter_config::ResourceKind;
use serde_json::{
    Map,
    Value,
};

const MAX_PAGES: u32 = 100;

type Instance = Map<String, Value>;

/// Flattens a nested attribute into a single label value.
type NestedLabel = fn(&Value) -> Option<&str>;

/// Where and how a resource kind is listed.
struct ListAction {
    endpoint: &'static str,
    version: &'static str,
    action: &'static str,
    /// Object keys leading to the instance array.
    path: [&'static str; 2],
    id_key: &'static str,
    page_size: u32,
    nested: &'static [(&'static str, NestedLabel)],
}

const ECS_NESTED: &[(&str, NestedLabel)] = &[
    ("InnerIpAddress", ip_address),
    ("PublicIpAddress", ip_address),
    ("VpcAttributes", vpc_private_ip_address),
];

fn list_action(kind: ResourceKind) -> ListAction {
    match kind {
        ResourceKind::Ecs => ListAction {
            endpoint: "ecs.aliyuncs.com",
            version: "2014-05-26",
            action: "DescribeInstances",
            path: ["Instances", "Instance"],
            id_key: "InstanceId",
            page_size: 100,
            nested: ECS_NESTED,
        },
        ResourceKind::Rds => ListAction {
            endpoint: "rds.aliyuncs.com",
            version: "2014-08-15",
            action: "DescribeDBInstances",
            path: ["Items", "DBInstance"],
            id_key: "DBInstanceId",
            page_size: 100,
            nested: &[],
        },
        ResourceKind::Redis => ListAction {
            endpoint: "r-kvstore.aliyuncs.com",
            version: "2015-01-01",
            action: "DescribeInstances",
            path: ["Instances", "KVStoreInstance"],
            id_key: "InstanceId",
            page_size: 50,
            nested: &[],
        },
        ResourceKind::Slb => ListAction {
            endpoint: "slb.aliyuncs.com",
            version: "2014-05-15",
            action: "DescribeLoadBalancers",
            path: ["LoadBalancers", "LoadBalancer"],
            id_key: "LoadBalancerId",
            page_size: 100,
            nested: &[],
        },
        ResourceKind::Mongodb => ListAction {
            endpoint: "mongodb.aliyuncs.com",
            version: "2015-12-01",
            action: "DescribeDBInstances",
            path: ["DBInstances", "DBInstance"],
            id_key: "DBInstanceId",
            page_size: 100,
            nested: &[],
        },
    }
}

/// `{"IpAddress": ["10.0.0.1"]}`
fn ip_address(value: &Value) -> Option<&str> {
    value.get("IpAddress")?.as_array()?.first()?.as_str()
}

/// `{"PrivateIpAddress": {"IpAddress": ["10.0.0.1"]}}`
fn vpc_private_ip_address(value: &Value) -> Option<&str> {
    ip_address(value.get("PrivateIpAddress")?)
}

/// Lists live instances of a resource kind in a region.
pub struct InventoryProvider {
    api: CloudApi,
}

impl InventoryProvider {
    pub fn new(api: CloudApi) -> Self {
        Self { api }
    }

    /// The `aliyun_meta_<resource>_info` family, or `None` when the region has no instances.
    pub async fn describe(&self, kind: ResourceKind, region_id: &str) -> Result<Option<MetricFamily>, ApiError> {
        let list = list_action(kind);
        let instances = self.list(&list, region_id).await?;
        let Some(first) = instances.first() else {
            debug!(resource = %kind, region_id, "No instances found");
            return Ok(None);
        };

        let attributes = label_attributes(&list, first);
        let mut family = MetricFamily::gauge(
            info_metric_name(kind),
            "",
            attributes.iter().map(|attr| sanitize_label_name(attr)).collect(),
        );
        for instance in &instances {
            let values = attributes
                .iter()
                .map(|attr| label_value(&list, instance, attr))
                .collect();
            family.add_sample(values, 1.0);
        }
        Ok(Some(family))
    }

    /// Ids of every instance of `kind` in `region_id`.
    pub async fn instance_ids(&self, kind: ResourceKind, region_id: &str) -> Result<Vec<String>, ApiError> {
        let list = list_action(kind);
        let instances = self.list(&list, region_id).await?;
        Ok(instances
            .iter()
            .filter_map(|instance| instance.get(list.id_key).and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    async fn list(&self, list: &ListAction, region_id: &str) -> Result<Vec<Instance>, ApiError> {
        let mut instances = Vec::new();
        for page_number in 1..=MAX_PAGES {
            let request = RpcRequest::new(list.endpoint, list.version, list.action)
                .region(region_id)
                .param("PageSize", list.page_size)
                .param("PageNumber", page_number);
            let response = self.api.call_json(&request).await?;

            let page: Vec<Instance> = response
                .get(list.path[0])
                .and_then(|v| v.get(list.path[1]))
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(|item| item.as_object().cloned()).collect())
                .unwrap_or_default();
            let fetched = page.len();
            instances.extend(page);

            if fetched < list.page_size as usize {
                return Ok(instances);
            }
        }
        warn!(action = list.action, region_id, "Stopped listing after {MAX_PAGES} pages");
        Ok(instances)
    }
}

pub fn info_metric_name(kind: ResourceKind) -> String {
    format!("{METRIC_PREFIX}_meta_{kind}_info")
}

/// Attributes of `first` that become labels: scalar strings and numbers plus the known nested ones.
fn label_attributes(list: &ListAction, first: &Instance) -> Vec<String> {
    first
        .iter()
        .filter(|(key, value)| {
            value.is_string() || value.is_number() || list.nested.iter().any(|(nested, _)| *nested == key.as_str())
        })
        .map(|(key, _)| key.clone())
        .collect()
}

fn label_value(list: &ListAction, instance: &Instance, attribute: &str) -> String {
    let Some(value) = instance.get(attribute) else {
        return String::new();
    };
    if let Some((_, flatten)) = list.nested.iter().find(|(nested, _)| *nested == attribute) {
        return flatten(value).unwrap_or_default().to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}
