use reqwest::StatusCode;

/// Failure of a single upstream RPC.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("Request to the Alibaba Cloud API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Alibaba Cloud API answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Alibaba Cloud API returned an unparsable body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Could not build the request URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Terminal outcome of a metric query that yielded no usable datapoints.
#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("giving up after {attempts} failed attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ApiError },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
