//! ogp-server entry point.
//!
//! Boots the preview image HTTP server: loads configuration, picks the cache,
//! and serves until Ctrl-C, then makes a last attempt to commit the cache.

use std::sync::Arc;

use anyhow::Result;
use ogp_client::{FetchConfig, OpenGraphResolver};
use ogp_core::AppConfig;
use ogp_core::cache::select_cache;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod handler;
mod lookup;
mod server;

#[cfg(test)]
mod test_support;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let selected = select_cache(config.cache_config())?;
    match config.listen_port() {
        Some(port) => {
            let resolver = OpenGraphResolver::new(FetchConfig::from(&config))?;
            let lookup = lookup::Lookup::new(selected.cache(), Arc::new(resolver));

            let listener = TcpListener::bind(("0.0.0.0", port)).await?;
            tracing::info!("Server listening at http://localhost:{}", port);
            server::serve(listener, handler::OgpServer::new(lookup), shutdown_signal()).await;
        }
        None => {
            tracing::info!("listen disabled, keeping the cache alive until shutdown");
            shutdown_signal().await;
        }
    }

    selected.shutdown().await;
    tracing::info!("stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}
