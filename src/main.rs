use aliyun_exporter::{
    init_errors,
    init_logging,
    router::create_router,
};
use aliyun_exporter_collector::Orchestrator;
use aliyun_exporter_config::{
    Args,
    Config,
};
use clap::Parser;
use color_eyre::Result;
use prometheus::Registry;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn start_server(config: Config) -> Result<()> {
    let registry = Registry::new();
    let orchestrator = Orchestrator::new(&config, &registry)?;
    let app = create_router(Arc::new(orchestrator), registry);

    let listener = TcpListener::bind(config.listen).await?;
    tracing::info!("listening on {}", config.listen);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    init_logging()?;
    let config = Config::new(Args::parse())?;
    start_server(config).await
}
