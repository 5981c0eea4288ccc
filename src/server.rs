use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    routing::{delete, get},
    Router,
};
use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;

use crate::api;
use crate::api::state::AppState;
use crate::error::LivePulseError;
use crate::poller::Poller;
use crate::probe::LiveProber;
use crate::watchlist::Watchlist;

pub struct WebServer {
    host: String,
    port: u16,
}

impl WebServer {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Serves the API and runs `poller` in the background until SIGINT/SIGTERM.
    pub async fn start<P>(&self, watchlist: Watchlist, poller: Poller<P>) -> Result<(), LivePulseError>
    where
        P: LiveProber + 'static,
    {
        let app = create_router(AppState::new(watchlist));

        let addr: SocketAddr = format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| LivePulseError::Error(format!("Invalid address: {}", e)))?;

        // Create shutdown channel for background tasks
        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);

        let poller_handle = tokio::spawn(poller.run(shutdown_rx));

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| LivePulseError::Error(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("livePulse server listening on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                info!("Shutdown signal received, stopping poller...");

                // Signal background tasks to stop
                let _ = shutdown_tx.send(());
            })
            .await
            .map_err(|e| LivePulseError::Error(format!("Server error: {}", e)))?;

        // A cycle in flight is allowed to finish, but not forever
        if tokio::time::timeout(Duration::from_secs(20), poller_handle)
            .await
            .is_err()
        {
            error!("Poller did not stop within 20s");
        }

        info!("Server shutdown complete");
        Ok(())
    }
}

pub(crate) fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Watchlist endpoints
        .route("/api/videos", get(api::videos::list_videos).post(api::videos::add_video))
        .route("/api/videos/{video_id}", delete(api::videos::delete_video))
        // Status endpoints
        .route("/api/status", get(api::status::list_status))
        .route("/api/status/{video_id}", get(api::status::get_status))
        // The browser frontend is served from another origin
        .layer(CorsLayer::permissive())
        // Add state for handlers
        .with_state(state)
}

/// Waits for a shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        },
        _ = terminate => {
            info!("Received SIGTERM");
        },
    }
}
