//! shellcache server entry point.
//!
//! Loads configuration, registers the worker (install then activate) and
//! serves MCP on stdio. Logging goes to stderr to avoid interfering with the
//! JSON-RPC protocol on stdout.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(origin = %config.origin, version = %config.version, "starting shellcache server on stdio transport");

    let worker = shellcache_client::register_global(&config).await?;

    let handler = handler::ShellCacheServer::new(worker.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    worker.db().clone().close().await?;
    tracing::info!("cache store closed");

    Ok(())
}
