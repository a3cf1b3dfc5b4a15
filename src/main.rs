mod api;
mod config;
mod ip;
mod pattern;
mod provider;
mod reconcile;
mod scheduler;
#[cfg(test)]
mod test_support;

use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::ip::HttpIpSource;
use crate::provider::cloudflare::CloudflareClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments (each one also reads its env var)
    let args = config::Args::parse();

    // Initialize logger with configured level (RUST_LOG takes precedence)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    // Bad zone configuration ends the process here, before any network traffic
    let config = config::Config::from_args(&args)?;

    info!("Loaded configuration: {:?}", config);

    if args.zones_json().is_some() {
        info!("Multi-zone mode: Managing {} zones", config.zones.len());
    } else {
        info!("Single-zone mode: Managing 1 zone");
    }

    let source = Arc::new(HttpIpSource::new(config.ip_url.clone())?);
    let provider = Arc::new(CloudflareClient::new(
        config.api_base.clone(),
        config.api_token.clone(),
    )?);

    let addr = format!("0.0.0.0:{}", config.health_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind liveness listener on {}", addr))?;

    info!("Health check listening on http://{}/health", addr);

    let server = axum::serve(listener, api::create_router())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    tokio::select! {
        result = server => {
            result.context("Liveness listener failed")?;
            info!("Shut down");
        }
        result = scheduler::run(source, provider, config.zones.clone(), config.update_interval) => {
            result?;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Termination signal received, closing liveness listener");
}
