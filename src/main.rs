use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use csv_insights_service::config::{redact_database_url, ServiceConfig};
use csv_insights_service::{GrpcServer, InsightsEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "csv_insights_service=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting CSV Insights Service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = ServiceConfig::from_env()?;

    info!("Configuration loaded:");
    info!("  gRPC Port: {}", config.grpc_port);
    info!(
        "  Database URL: {}",
        config
            .database_url
            .as_deref()
            .map(redact_database_url)
            .unwrap_or_else(|| "<in-memory>".to_string())
    );
    info!("  Max upload bytes: {}", config.max_upload_bytes);
    info!(
        "  Page size: {} (max {})",
        config.default_page_size, config.max_page_size
    );

    let grpc_port = config.grpc_port;
    let engine = Arc::new(InsightsEngine::from_config(config).await?);

    let grpc_server = GrpcServer::new(engine.clone());
    let grpc_addr: SocketAddr = ([0, 0, 0, 0], grpc_port).into();
    let grpc_handle = tokio::spawn(async move {
        if let Err(e) = grpc_server.start(grpc_addr).await {
            error!("gRPC server error: {}", e);
        }
    });

    info!("CSV Insights Service started successfully");
    info!("gRPC server listening on {}", grpc_addr);

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, gracefully shutting down...");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    grpc_handle.abort();

    info!("CSV Insights Service shutdown complete");
    Ok(())
}
