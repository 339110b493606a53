//! # Snell Panel
//!
//! Server entry point.
//!
//! ## Startup Sequence
//!
//! 1. Parse configuration (flags, then environment)
//! 2. Initialize logging
//! 3. Validate configuration (the API token is mandatory)
//! 4. Open the store and build the service
//! 5. Serve until Ctrl+C or SIGTERM

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use snell_panel::{build_router, Config, PanelService};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args();
    init_tracing(&config)?;

    config.validate().context("invalid configuration")?;

    let service = PanelService::from_config(&config).context("failed to initialize service")?;
    let router = build_router(Arc::new(service), config.http_settings());

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(
        %addr,
        environment = %config.environment,
        version = snell_panel::VERSION,
        "Snell panel listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Snell panel stopped");
    Ok(())
}

fn init_tracing(config: &Config) -> Result<()> {
    let default_level = if config.is_development() { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))?;

    if config.log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
