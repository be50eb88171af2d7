use super::{
    RpcRequest,
    RpcTransport,
};
use crate::error::ApiError;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use std::sync::Mutex;

type Handler = Box<dyn Fn(&RpcRequest) -> Result<String, ApiError> + Send + Sync>;

/// Transport answering from a closure and recording every request.
pub(crate) struct FakeTransport {
    handler: Handler,
    calls: Mutex<Vec<RpcRequest>>,
}

impl FakeTransport {
    pub(crate) fn new(handler: impl Fn(&RpcRequest) -> Result<String, ApiError> + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<RpcRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, action: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.action == action).count()
    }
}

impl RpcTransport for FakeTransport {
    fn call<'a>(&'a self, request: &'a RpcRequest) -> BoxFuture<'a, Result<String, ApiError>> {
        self.calls.lock().unwrap().push(request.clone());
        let result = (self.handler)(request);
        Box::pin(async move { result })
    }
}

pub(crate) fn unavailable() -> ApiError {
    ApiError::Status {
        status: StatusCode::SERVICE_UNAVAILABLE,
        body: r#"{"Code":"ServiceUnavailable"}"#.to_string(),
    }
}
