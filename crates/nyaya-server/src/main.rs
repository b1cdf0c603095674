mod logging;
mod routes;

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use nyaya_core::{
    config::Config,
    coordinator::DebateCoordinator,
    store::InMemorySessionStore,
};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::prelude::*;

use crate::logging::{BroadcastLayer, LogRing};

// ── AppState ──────────────────────────────────────────────────────────────

pub struct AppState {
    pub coordinator: Arc<DebateCoordinator>,
    pub start_time: Instant,
    pub log_tx: broadcast::Sender<String>,
    pub log_ring: LogRing,
}

// ── main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let broadcast_layer = BroadcastLayer::new();
    let log_tx = broadcast_layer.tx.clone();
    let log_ring = Arc::clone(&broadcast_layer.ring);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "nyaya_server=info,nyaya_core=info,nyaya_agent=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(broadcast_layer)
        .init();

    let config = Config::from_env()?;
    let backend = nyaya_agent::backend_from_config(&config);
    info!(
        backend = %backend.name(),
        max_rounds = config.max_rounds,
        history_window = config.history_window,
        "llm backend selected"
    );

    let coordinator = Arc::new(DebateCoordinator::new(
        Arc::new(InMemorySessionStore::new()),
        backend,
        config.coordinator_settings(),
    ));

    // Idle session sweep
    {
        let coordinator = Arc::clone(&coordinator);
        let interval = config.sweep_interval();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let evicted = coordinator.sweep_expired(Utc::now()).await;
                if evicted > 0 {
                    info!(evicted, "session sweep");
                }
            }
        });
    }

    let state = Arc::new(AppState {
        coordinator,
        start_time: Instant::now(),
        log_tx,
        log_ring,
    });
    let app = routes::router(state, config.cors_permissive);

    let addr = format!("{}:{}", config.web_bind, config.web_port);
    info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
