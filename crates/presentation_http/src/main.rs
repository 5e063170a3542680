//! Faultline proxy server
//!
//! Main entry point: load configuration, bootstrap telemetry, seed the
//! rule registry and serve until shutdown. Startup problems - unreadable
//! config, missing tracking header, invalid seed rules - exit non-zero
//! with a diagnostic.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use application::{Matcher, RuleRegistry, SamplerSource};
use domain::{Rule, ServiceName};
use infrastructure::{AppConfig, HttpUpstream, init_telemetry};
use presentation_http::{create_router, state::AppState};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to read configuration")?;
    init_telemetry(&config.telemetry);
    config.validate().context("invalid configuration")?;

    info!(
        service = %config.proxy.service_name,
        tracking_header = %config.proxy.tracking_header,
        upstreams = config.proxy.upstreams.len(),
        "configuration loaded"
    );

    let registry = Arc::new(RuleRegistry::new());
    for (index, rule_config) in config.rules.iter().enumerate() {
        let rule = Rule::from_config(rule_config)
            .with_context(|| format!("invalid rule at index {index}"))?;
        registry.add(rule);
    }
    if !registry.is_empty() {
        info!(rules = registry.len(), "rule registry seeded");
    }

    let upstream = HttpUpstream::new(config.proxy.upstreams.clone())
        .context("failed to build upstream client")?;
    let service_name = ServiceName::new(config.proxy.service_name.clone())
        .context("invalid proxy.service_name")?;

    let state = AppState {
        registry,
        matcher: Arc::new(Matcher::new(config.proxy.tracking_header.clone())),
        upstream: Arc::new(upstream),
        service_name,
        samplers: Arc::new(SamplerSource::from_entropy()),
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
        max_body_bytes: config.server.max_body_bytes,
    };

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("proxy listening on http://{addr}");

    let shutdown_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_timeout))
        .await?;

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl+C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
    info!("draining connections for up to {timeout:?}");
}
