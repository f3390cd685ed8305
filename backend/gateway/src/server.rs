//! Main HTTP Gateway Server.
//!
//! Wires the stream, action, bootstrap and health endpoints onto one router.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use statecast_config::StatecastConfig;
use statecast_core::Hub;

use crate::{actions, bootstrap, events, health_api};

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = statecast_config::validation::RESERVED_HEALTH_PATH;

/// Application state shared across routes.
#[derive(Clone)]
pub struct GatewayState {
    pub hub: Hub,
    pub config: Arc<StatecastConfig>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayState {
    pub fn new(hub: Hub, config: StatecastConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            hub,
            config: Arc::new(config),
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// End every open stream. New streams opened afterwards end immediately.
    pub fn begin_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Resolves once [`GatewayState::begin_shutdown`] has been called.
    pub fn shutdown_signal(&self) -> impl std::future::Future<Output = ()> + Send + use<> {
        let mut rx = self.shutdown_rx.clone();
        async move {
            let _ = rx.wait_for(|stopping| *stopping).await;
        }
    }
}

/// Build the router with all routes.
pub fn build_router(state: GatewayState) -> Router {
    let routes = &state.config.routes;
    let mut app = Router::new()
        .route(&routes.event_url, get(events::stream_events))
        .route(&routes.action_url, post(actions::post_action))
        .route(&routes.bootstrap_url, get(bootstrap::get_bootstrap))
        .route(HEALTH_PATH, get(health_api::get_health))
        .layer(TraceLayer::new_for_http());

    if state.config.server.cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}

/// Serve until Ctrl-C / SIGTERM, then close open streams and drain.
#[instrument(skip(state))]
pub async fn start_server(addr: SocketAddr, state: GatewayState) -> Result<()> {
    let app = build_router(state.clone());

    info!("Gateway HTTP server listening on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            os_shutdown_signal().await;
            info!("Shutdown requested; closing open streams");
            state.begin_shutdown();
        })
        .await?;

    Ok(())
}

async fn os_shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
