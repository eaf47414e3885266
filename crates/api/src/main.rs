use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use runtime::{ContainerRuntime, DockerCli};
use shop_provisioner_api::{app, config::Config, middleware};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("failed to load configuration")?;

    middleware::logging::init_logging(&config.logging)
        .context("failed to install tracing subscriber")?;
    middleware::init_metrics().context("failed to install Prometheus recorder")?;

    info!("Starting Shop Provisioner v{}", env!("CARGO_PKG_VERSION"));

    let docker = DockerCli::new(config.docker.binary.clone());
    match docker.version().await {
        Ok(version) => info!(binary = %config.docker.binary, %version, "Container runtime reachable"),
        Err(e) => warn!(binary = %config.docker.binary, error = %e, "Container runtime not reachable yet"),
    }
    let runtime: Arc<dyn ContainerRuntime> = Arc::new(docker);

    let addr = config.socket_addr().context("invalid server host/port")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(public_base_url = %config.docker.public_base_url, "Server listening on {}", addr);

    axum::serve(listener, app::create_app(config, runtime))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C so in-flight provisioning runs can finish.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
