use std::sync::Arc;

use axum::Router;
use cas_store::{LocalFsStore, ObjectStore};
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::notify::CallbackNotifier;
use crate::router::build_router;
use crate::state::AppState;

/// Content-addressed blob server.
pub struct CasServer {
    config: ServerConfig,
    store: Arc<dyn ObjectStore>,
}

impl CasServer {
    /// Open (creating if needed) the filesystem store at `config.storage_root`
    /// and reclaim staging files left behind by earlier crashes.
    pub async fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = LocalFsStore::open(&config.storage_root).await?;
        if let Some(grace) = config.staging_grace() {
            store.sweep_staging(grace).await?;
        }
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Serve an arbitrary backend.
    pub fn with_store(config: ServerConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> ServerResult<Router> {
        let notifier = CallbackNotifier::new(self.config.callback_timeout())?;
        let router = build_router(AppState::new(Arc::clone(&self.store), notifier));
        Ok(match self.config.max_object_size {
            Some(limit) => {
                let limit = usize::try_from(limit).map_err(|_| {
                    ServerError::Config(format!("max_object_size {limit} does not fit in memory"))
                })?;
                router.layer(RequestBodyLimitLayer::new(limit))
            }
            None => router,
        })
    }

    /// Bind `config.bind_addr` and serve until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener until Ctrl-C.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let app = self.router()?;
        info!(addr = %listener.local_addr()?, "cas server listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

impl std::fmt::Debug for CasServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CasServer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_store::InMemoryObjectStore;
    use std::time::{Duration, SystemTime};

    #[test]
    fn server_construction() {
        let server = CasServer::with_store(
            ServerConfig::default(),
            Arc::new(InMemoryObjectStore::new()),
        );
        assert_eq!(server.config().bind_addr, "127.0.0.1:8081".parse().unwrap());
    }

    #[tokio::test]
    async fn router_builds_with_limit() {
        let config = ServerConfig {
            max_object_size: Some(1024),
            ..ServerConfig::default()
        };
        let server = CasServer::with_store(config, Arc::new(InMemoryObjectStore::new()));
        assert!(server.router().is_ok());
    }

    #[tokio::test]
    async fn open_with_zero_grace_keeps_staging() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        std::fs::create_dir_all(&root).unwrap();
        std::fs::write(root.join("store-orphan"), b"partial").unwrap();

        let config = ServerConfig {
            storage_root: root.clone(),
            staging_grace_secs: 0,
            ..ServerConfig::default()
        };
        CasServer::open(config).await.unwrap();
        // sweep disabled
        assert!(root.join("store-orphan").exists());
    }

    #[tokio::test]
    async fn open_sweeps_stale_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("store");
        std::fs::create_dir_all(&root).unwrap();
        let stale = root.join("store-stale");
        let fresh = root.join("store-fresh");
        std::fs::write(&stale, b"partial").unwrap();
        std::fs::write(&fresh, b"in flight").unwrap();
        std::fs::File::options()
            .write(true)
            .open(&stale)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(7200))
            .unwrap();

        let config = ServerConfig {
            storage_root: root.clone(),
            ..ServerConfig::default()
        };
        CasServer::open(config).await.unwrap();
        assert!(!stale.exists());
        assert!(fresh.exists());
    }
}
