use crate::{
    api::CloudApi,
    error::QueryError,
    metrics::RequestMetrics,
};
use aliyun_exporter_config::RetryConfig;
use serde_json::{
    Map,
    Value,
};
use std::time::Duration;
use tokio::time::{
    sleep,
    Instant,
};

/// One CloudMonitor datapoint: attribute name to value, in the order the API returned them.
pub type Datapoint = Map<String, Value>;

/// Upper bound of `NextToken` pages followed for one metric.
const MAX_PAGES: usize = 50;

/// Fetches the latest datapoints of a metric from CloudMonitor.
pub struct MetricQueryClient {
    api: CloudApi,
    metrics: RequestMetrics,
    max_attempts: u32,
    backoff: Duration,
}

impl MetricQueryClient {
    pub fn new(api: CloudApi, metrics: RequestMetrics, retry: &RetryConfig) -> Self {
        Self {
            api,
            metrics,
            max_attempts: retry.max_attempts.max(1),
            backoff: retry.backoff(),
        }
    }

    /// Queries `DescribeMetricLast`.
    ///
    /// `Ok(vec![])` means the API answered with an empty `Datapoints` field. Transport failures are retried up to
    /// the configured number of attempts; a body without `Datapoints` is a [`QueryError::MalformedResponse`].
    pub async fn query(&self, namespace: &str, metric_name: &str, period: u64) -> Result<Vec<Datapoint>, QueryError> {
        let start = Instant::now();
        let mut datapoints = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let body = match self
                .call_with_retry(namespace, metric_name, period, next_token.as_deref())
                .await
            {
                Ok(body) => body,
                Err(err) => {
                    self.metrics.observe_failure(namespace, start.elapsed());
                    return Err(err);
                }
            };

            let page = match parse_datapoints(&body) {
                Ok(page) => page,
                Err(reason) => {
                    self.metrics.observe_success(namespace, start.elapsed());
                    warn!(namespace, metric_name, "Error query metrics for {namespace}_{metric_name}: {reason}");
                    return Err(QueryError::MalformedResponse(reason));
                }
            };

            datapoints.extend(page.datapoints);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        if next_token.is_some() {
            warn!(namespace, metric_name, "Stopped following NextToken after {MAX_PAGES} pages");
        }

        self.metrics.observe_success(namespace, start.elapsed());
        Ok(datapoints)
    }

    async fn call_with_retry(
        &self,
        namespace: &str,
        metric_name: &str,
        period: u64,
        next_token: Option<&str>,
    ) -> Result<String, QueryError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            if attempt > 1 {
                warn!(namespace, metric_name, attempt, "Previous request failed, sending attempt {attempt}");
                sleep(self.backoff).await;
            }

            match self
                .api
                .describe_metric_last(namespace, metric_name, period, next_token)
                .await
            {
                Ok(body) => return Ok(body),
                Err(err) if attempt < self.max_attempts => {
                    error!(error = %err, namespace, metric_name, attempt, "Error request cloud monitor api");
                }
                Err(last) => {
                    error!(
                        error = %last,
                        namespace,
                        metric_name,
                        "Giving up on cloud monitor api after {attempt} attempts"
                    );
                    return Err(QueryError::RetriesExhausted { attempts: attempt, last });
                }
            }
        }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct DatapointPage {
    pub datapoints: Vec<Datapoint>,
    pub next_token: Option<String>,
}

/// Extracts the datapoints of a `DescribeMetricLast` body.
///
/// `Datapoints` is usually a JSON encoded string; an inline array is accepted too.
pub fn parse_datapoints(body: &str) -> Result<DatapointPage, String> {
    let data: Value = serde_json::from_str(body).map_err(|err| format!("the response body is not JSON: {err}"))?;

    let datapoints = match data.get("Datapoints") {
        None | Some(Value::Null) => {
            return Err(
                "the response body does not have a Datapoints field, please check your permission or workload"
                    .to_string(),
            )
        }
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Vec::new(),
        Some(Value::String(encoded)) => serde_json::from_str::<Vec<Datapoint>>(encoded)
            .map_err(|err| format!("the Datapoints field is not a list of objects: {err}"))?,
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| format!("datapoint is not an object: {item}"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(format!("unexpected Datapoints value: {other}")),
    };

    let next_token = data
        .get("NextToken")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    Ok(DatapointPage { datapoints, next_token })
}
