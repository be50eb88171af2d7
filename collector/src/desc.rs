//! Instance id to display name lookup for Redis (r-kvstore) instances.

use crate::{
    api::CloudApi,
    cache::TtlCache,
    error::ApiError,
};
use aliyun_exporter_config::NameCacheConfig;
use serde_json::Value;
use tokio::sync::Mutex;

const PAGE_SIZE: u32 = 50;
const MAX_PAGES: u32 = 200;

/// Resolves instance ids to instance names through a time-expiring cache.
///
/// A miss lists every instance once and caches all of them; ids that are still unknown afterwards are cached as
/// `""` so they do not trigger another listing until they expire.
pub struct NameResolver {
    api: CloudApi,
    cache: Mutex<TtlCache<String>>,
}

impl NameResolver {
    pub fn new(api: CloudApi, config: &NameCacheConfig) -> Self {
        Self {
            api,
            cache: Mutex::new(TtlCache::new(config.ttl(), config.max_entries)),
        }
    }

    pub async fn resolve(&self, id: &str) -> String {
        let mut cache = self.cache.lock().await;
        if let Some(name) = cache.get(id) {
            return name.clone();
        }

        info!(instance_id = id, "Start to query instance names");
        if let Err(err) = self.list_instances(&mut cache).await {
            error!(error = %err, instance_id = id, "Listing instances for name lookup failed");
        }

        if let Some(name) = cache.get(id) {
            return name.clone();
        }
        cache.insert(id.to_string(), String::new());
        String::new()
    }

    async fn list_instances(&self, cache: &mut TtlCache<String>) -> Result<(), ApiError> {
        let mut page_number = 1;
        loop {
            let response = self.api.describe_kvstore_instances(PAGE_SIZE, page_number).await?;
            let body = response.get("body").unwrap_or(&response);

            for instance in kvstore_instances(body) {
                if let Some(id) = instance.get("InstanceId").and_then(Value::as_str) {
                    let name = instance.get("InstanceName").and_then(Value::as_str).unwrap_or_default();
                    cache.insert(id.to_string(), name.to_string());
                }
            }

            let total = body.get("TotalCount").and_then(Value::as_u64).unwrap_or(0);
            if total <= u64::from(page_number) * u64::from(PAGE_SIZE) {
                return Ok(());
            }
            if page_number >= MAX_PAGES {
                warn!(total, "Stopped listing instances after {MAX_PAGES} pages");
                return Ok(());
            }
            page_number += 1;
        }
    }
}

fn kvstore_instances(body: &Value) -> &[Value] {
    body.get("Instances")
        .and_then(|instances| instances.get("KVStoreInstance"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::fake::{
            unavailable,
            FakeTransport,
        },
        rate_limiter::RateLimiter,
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::{
        sync::Arc,
        time::Duration,
    };

    fn resolver(transport: Arc<FakeTransport>) -> NameResolver {
        let api = CloudApi::new(transport, Arc::new(RateLimiter::new(100)));
        NameResolver::new(
            api,
            &NameCacheConfig {
                ttl_seconds: 600,
                max_entries: 10_000,
            },
        )
    }

    /// Serves `total` instances `r-<n>` named `redis-<n>`.
    fn paged_instances(total: u64) -> FakeTransport {
        FakeTransport::new(move |request| {
            let page: u64 = request.get("PageNumber").unwrap().parse().unwrap();
            let size: u64 = request.get("PageSize").unwrap().parse().unwrap();
            let instances: Vec<_> = ((page - 1) * size..(page * size).min(total))
                .map(|n| json!({"InstanceId": format!("r-{n}"), "InstanceName": format!("redis-{n}")}))
                .collect();
            Ok(json!({"TotalCount": total, "Instances": {"KVStoreInstance": instances}}).to_string())
        })
    }

    #[tokio::test(start_paused = true)]
    async fn second_lookup_within_ttl_is_served_from_cache() {
        let transport = Arc::new(paged_instances(3));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("r-1").await, "redis-1");
        assert_eq!(resolver.resolve("r-1").await, "redis-1");
        assert_eq!(resolver.resolve("r-2").await, "redis-2");
        assert_eq!(transport.count("DescribeInstances"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lists_every_page() {
        let transport = Arc::new(paged_instances(120));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("r-119").await, "redis-119");
        let pages: Vec<_> = transport
            .calls()
            .iter()
            .map(|r| r.get("PageNumber").unwrap().to_string())
            .collect();
        assert_eq!(pages, vec!["1", "2", "3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_id_is_cached_as_empty() {
        let transport = Arc::new(paged_instances(2));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("r-missing").await, "");
        assert_eq!(resolver.resolve("r-missing").await, "");
        assert_eq!(transport.count("DescribeInstances"), 1);

        tokio::time::advance(Duration::from_secs(601)).await;
        assert_eq!(resolver.resolve("r-missing").await, "");
        assert_eq!(transport.count("DescribeInstances"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tolerates_empty_bodies() {
        let transport = Arc::new(FakeTransport::new(|_| Ok(r#"{"body":{"Instances":null}}"#.to_string())));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("r-1").await, "");
        assert_eq!(transport.count("DescribeInstances"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_failure_caches_empty() {
        let transport = Arc::new(FakeTransport::new(|_| Err(unavailable())));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("r-1").await, "");
        assert_eq!(resolver.resolve("r-1").await, "");
        assert_eq!(transport.count("DescribeInstances"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn listing_stops_at_page_cap() {
        let transport = Arc::new(FakeTransport::new(|request| {
            let instances = match request.get("PageNumber") {
                Some("1") => json!([{"InstanceId": "r-0", "InstanceName": "redis-0"}]),
                _ => json!([]),
            };
            Ok(json!({"TotalCount": 1_000_000_000u64, "Instances": {"KVStoreInstance": instances}}).to_string())
        }));
        let resolver = resolver(transport.clone());

        assert_eq!(resolver.resolve("r-0").await, "redis-0");
        assert_eq!(transport.count("DescribeInstances"), MAX_PAGES as usize);
    }
}
