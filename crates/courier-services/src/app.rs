//! Application assembly

use std::future::Future;

use anyhow::{Context, Result};
use courier_api::{ApiResult, Router, Server};
use tokio::net::TcpListener;
use tracing::info;

use crate::calculator;
use crate::config::ServiceConfig;
use crate::storage::FileStore;
use crate::upload;

/// Router with every service mounted
pub fn build_router(store: FileStore) -> ApiResult<Router> {
    let mut router = Router::new();
    calculator::register(&mut router)?;
    upload::register(&mut router, store)?;
    Ok(router)
}

/// Prepare the upload directory and build the server
pub async fn build_server(config: &ServiceConfig) -> Result<Server> {
    let store = FileStore::open(&config.upload_dir)
        .await
        .context("Failed to prepare upload directory")?;
    let router = build_router(store).context("Failed to register routes")?;
    Ok(Server::new(router, config.server_config()))
}

/// Run until Ctrl+C or SIGTERM
pub async fn run(config: ServiceConfig) -> Result<()> {
    info!("Starting courier on {}", config.bind_addr);
    let server = build_server(&config).await?;
    server.run().await.context("Server failed")?;
    info!("courier stopped");
    Ok(())
}

/// Run on an already bound listener until `shutdown` completes
pub async fn run_until<F>(config: ServiceConfig, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send,
{
    let server = build_server(&config).await?;
    server
        .serve(listener, shutdown)
        .await
        .context("Server failed")?;
    Ok(())
}
