use crate::error::AppError;
use aliyun_exporter_collector::{
    encode_text,
    metrics::exposition::CONTENT_TYPE,
    Collector,
    Orchestrator,
};
use axum::{
    extract::State,
    http::header,
    response::{
        Html,
        IntoResponse,
        Response,
    },
    routing::get,
    Router,
};
use prometheus::{
    Encoder as _,
    Registry,
    TextEncoder,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// The exporter's own metrics.
    pub registry: Registry,
}

pub fn create_router(orchestrator: Arc<Orchestrator>, registry: Registry) -> Router {
    let state = AppState { orchestrator, registry };

    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .with_state(state)
}

/// Runs one collection cycle.
async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let families = state.orchestrator.collect().await;
    let mut body = encode_text(&families).into_bytes();
    TextEncoder::new().encode(&state.registry.gather(), &mut body)?;

    debug!(families = families.len(), bytes = body.len(), "Scrape served");
    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
}

async fn healthz() -> &'static str {
    "OK"
}

async fn index() -> Html<&'static str> {
    Html(
        "<html><head><title>Aliyun Exporter</title></head>\
         <body><h1>Aliyun Exporter</h1><p><a href=\"/metrics\">Metrics</a></p></body></html>",
    )
}
