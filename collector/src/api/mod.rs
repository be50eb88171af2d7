//! Upstream Alibaba Cloud RPC API.
//!
//! [`RpcTransport`] is the seam to the network: it sends one [`RpcRequest`] and hands back the raw JSON body.
//! [`CloudApi`] layers the shared [`RateLimiter`] and the typed calls the collectors need on top of it.

mod http;
mod signer;

#[cfg(test)]
pub(crate) mod fake;

use crate::{
    error::ApiError,
    rate_limiter::RateLimiter,
};
use futures::future::BoxFuture;
pub use http::HttpTransport;
use serde_json::Value;
pub use signer::{
    percent_encode,
    Signer,
};
use std::{
    collections::BTreeMap,
    sync::Arc,
};

pub const CMS_ENDPOINT: &str = "metrics.aliyuncs.com";
pub const CMS_VERSION: &str = "2019-01-01";
pub const RDS_ENDPOINT: &str = "rds.aliyuncs.com";
pub const RDS_VERSION: &str = "2014-08-15";
pub const KVSTORE_ENDPOINT: &str = "r-kvstore.aliyuncs.com";
pub const KVSTORE_VERSION: &str = "2015-01-01";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcRequest {
    /// Host name of the product endpoint, e.g. `metrics.aliyuncs.com`.
    pub endpoint: &'static str,
    pub version: &'static str,
    pub action: &'static str,
    pub region_id: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl RpcRequest {
    pub fn new(endpoint: &'static str, version: &'static str, action: &'static str) -> Self {
        Self {
            endpoint,
            version,
            action,
            region_id: None,
            params: BTreeMap::new(),
        }
    }

    pub fn region(mut self, region_id: impl Into<String>) -> Self {
        self.region_id = Some(region_id.into());
        self
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

pub trait RpcTransport: Send + Sync {
    /// Sends a single request and returns the response body.
    fn call<'a>(&'a self, request: &'a RpcRequest) -> BoxFuture<'a, Result<String, ApiError>>;
}

/// Rate limited access to the RPCs used by the collectors.
#[derive(Clone)]
pub struct CloudApi {
    transport: Arc<dyn RpcTransport>,
    limiter: Arc<RateLimiter>,
}

impl CloudApi {
    pub fn new(transport: Arc<dyn RpcTransport>, limiter: Arc<RateLimiter>) -> Self {
        Self { transport, limiter }
    }

    /// Sends `request` once the rate limiter admits it.
    pub async fn call(&self, request: &RpcRequest) -> Result<String, ApiError> {
        self.limiter.acquire().await;
        trace!(action = request.action, endpoint = request.endpoint, "Calling Alibaba Cloud API");
        self.transport.call(request).await
    }

    pub async fn call_json(&self, request: &RpcRequest) -> Result<Value, ApiError> {
        let body = self.call(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// CloudMonitor `DescribeMetricLast`, returned unparsed so callers can tell malformed bodies apart.
    pub async fn describe_metric_last(
        &self,
        namespace: &str,
        metric_name: &str,
        period: u64,
        next_token: Option<&str>,
    ) -> Result<String, ApiError> {
        let mut request = RpcRequest::new(CMS_ENDPOINT, CMS_VERSION, "DescribeMetricLast")
            .param("Namespace", namespace)
            .param("MetricName", metric_name)
            .param("Period", period);
        if let Some(token) = next_token {
            request = request.param("NextToken", token);
        }
        self.call(&request).await
    }

    /// RDS `DescribeDBInstancePerformance` for a comma separated list of performance keys.
    pub async fn describe_instance_performance(
        &self,
        region_id: &str,
        instance_id: &str,
        keys: &str,
        start_time: &str,
        end_time: &str,
    ) -> Result<Value, ApiError> {
        let request = RpcRequest::new(RDS_ENDPOINT, RDS_VERSION, "DescribeDBInstancePerformance")
            .region(region_id)
            .param("DBInstanceId", instance_id)
            .param("Key", keys)
            .param("StartTime", start_time)
            .param("EndTime", end_time);
        self.call_json(&request).await
    }

    /// Redis (r-kvstore) `DescribeInstances`, one page.
    pub async fn describe_kvstore_instances(&self, page_size: u32, page_number: u32) -> Result<Value, ApiError> {
        let request = RpcRequest::new(KVSTORE_ENDPOINT, KVSTORE_VERSION, "DescribeInstances")
            .param("PageSize", page_size)
            .param("PageNumber", page_number);
        self.call_json(&request).await
    }
}
