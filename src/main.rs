//! Bench Cache - caching core of the benchmarking service
//!
//! Runs the cache facade behind a small admin HTTP API.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bench_cache::api::create_router;
use bench_cache::store::{MemoryStore, RedisStore, RemoteStore};
use bench_cache::{spawn_cleanup_task, AppState, Backend, CacheService, Config};

/// Main entry point for the cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect the configured remote store
/// 4. Start the expiry sweep when running on the in-memory store
/// 5. Create Axum router with all endpoints
/// 6. Start HTTP server on configured port
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bench_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Bench Cache");

    let config = Config::from_env().context("invalid configuration")?;
    info!(
        "Configuration loaded: backend={:?}, prefix={}, default_ttl={}s, port={}",
        config.backend, config.key_prefix, config.default_ttl, config.server_port
    );

    let (store, cleanup_handle): (Arc<dyn RemoteStore>, Option<JoinHandle<()>>) =
        match config.backend {
            Backend::Memory => {
                let store = Arc::new(MemoryStore::new());
                let handle = spawn_cleanup_task(store.clone(), config.cleanup_interval);
                (store as Arc<dyn RemoteStore>, Some(handle))
            }
            Backend::Redis => {
                let store = RedisStore::connect(&config.redis_url)
                    .await
                    .context("failed to connect to Redis")?;
                (Arc::new(store) as Arc<dyn RemoteStore>, None)
            }
        };

    let cache = CacheService::new(&config, store).context("failed to build cache service")?;
    info!("Cache service initialized on {} store", cache.gateway().backend());

    let app = create_router(AppState::new(cache));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cleanup_handle))
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the sweep task and allows graceful shutdown.
async fn shutdown_signal(cleanup_handle: Option<JoinHandle<()>>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Expiry sweep task aborted");
    }
}
