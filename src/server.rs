//! HTTP server lifecycle: startup, background tasks, graceful shutdown.

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::routes::create_router;
use crate::config::Settings;
use crate::jobs;
use crate::state::AppState;

pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Starts the server and runs until a shutdown signal.
    ///
    /// Builds the shared state, spawns the bootstrap and sync loops, then
    /// serves the API. The background loops are fire-and-forget; they are
    /// dropped with the runtime on shutdown.
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            host = %self.settings.server.host,
            port = %self.settings.server.port,
            cache_dir = %self.settings.cache.base_dir,
            "Server configuration loaded"
        );
        tracing::info!(
            list_cache_ttl = %self.settings.douban.list_cache_ttl_seconds,
            idatabase = %self.settings.imdb.idatabase_url.is_some(),
            sync_peers = %self.settings.sync.push_to.len(),
            "Proxy configuration loaded"
        );

        let state = AppState::new(&self.settings)?;

        tokio::spawn(jobs::bootstrap::run(
            state.collections.clone(),
            state.imdb.clone(),
            self.settings.bootstrap.clone(),
        ));
        tokio::spawn(jobs::sync::run(
            state.imdb.clone(),
            self.settings.sync.clone(),
            state.throttler.clone(),
        ));

        let router = create_router(state);

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;
        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
