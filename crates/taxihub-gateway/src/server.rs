//! Server startup and lifecycle

use crate::{limiter::ClientLimiter, routes, AppState, GatewayConfig};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

/// Run the gateway server until Ctrl-C or SIGTERM
pub async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    run_server_with_shutdown(config, shutdown_signal()).await
}

/// Run server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: GatewayConfig,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(config)?);

    let addr = state.config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;

    info!("🚀 TaxiHub Gateway listening on http://{}", listener.local_addr()?);

    serve(listener, state, shutdown_signal).await?;

    info!("👋 Gateway shutdown complete");

    Ok(())
}

/// Serve the gateway on an already bound listener
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let sweeper = spawn_limiter_sweep(Arc::clone(&state.limiter), state.config.limiter_sweep_secs);
    let app = routes::create_router(state);

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }

    result
}

/// Periodically drop idle limiter buckets; `interval_secs == 0` disables it
pub fn spawn_limiter_sweep(
    limiter: Arc<ClientLimiter>,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        return None;
    }

    info!(interval_secs, "Rate limiter idle sweep enabled");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            limiter.sweep_idle();
        }
    }))
}

/// Resolves on Ctrl-C, or SIGTERM on unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
