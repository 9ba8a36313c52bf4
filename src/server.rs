//! HTTP server: state, router, storage selection and graceful shutdown.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use registry_core::{
    seed_store, MemoryBackend, SeedReport, SqliteBackend, StorageBackend, StorageResult,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, StorageType};
use crate::handlers;

/// Shared by every request.
#[derive(Clone)]
pub struct AppState {
    /// Record store
    pub store: Arc<dyn StorageBackend>,
    /// Resolved configuration
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn StorageBackend>, config: Arc<Config>) -> Self {
        Self { store, config }
    }
}

/// Build the router. `/debug/config` exists only in development environments.
pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/servers",
            get(handlers::list_servers).post(handlers::create_server),
        )
        .route("/servers/count", get(handlers::count_servers))
        .route("/servers/search", get(handlers::search_servers))
        .route(
            "/servers/:id",
            get(handlers::get_server)
                .put(handlers::update_server)
                .delete(handlers::delete_server),
        );

    if state.config.is_development() {
        router = router.route("/debug/config", get(handlers::debug_config));
    }

    let timeout = state.config.request_timeout();
    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
}

/// Open the configured backend.
///
/// # Errors
/// Returns error if the SQLite database cannot be opened or migrated.
pub async fn open_store(config: &Config) -> StorageResult<Arc<dyn StorageBackend>> {
    let store: Arc<dyn StorageBackend> = match config.storage_type {
        StorageType::Memory => Arc::new(MemoryBackend::new()),
        StorageType::Sqlite => Arc::new(SqliteBackend::open(config.sqlite_config()).await?),
    };

    tracing::info!(backend = store.backend_name(), "storage opened");
    Ok(store)
}

/// Seed the store unless `--no-seed` is set.
///
/// Seeding is best-effort: a failure is logged and the server keeps the
/// store's current contents.
pub async fn seed(config: &Config, store: &dyn StorageBackend) -> Option<SeedReport> {
    if config.no_seed {
        tracing::info!("seeding disabled");
        return None;
    }

    match seed_store(store, &config.seed_path()).await {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::warn!(error = %e, "seeding failed, continuing with current store contents");
            None
        }
    }
}

/// Serve until SIGINT or SIGTERM, then drain in-flight requests.
///
/// # Errors
/// Returns error if the address cannot be bound or the server fails.
pub async fn serve(config: Arc<Config>, store: Arc<dyn StorageBackend>) -> anyhow::Result<()> {
    let address = config.address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(%address, backend = store.backend_name(), "listening");
    if config.is_development() {
        tracing::info!("debug endpoint enabled at /debug/config");
    }

    let app = build_app(AppState::new(store, config));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
