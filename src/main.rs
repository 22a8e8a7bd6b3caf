//! object-cache-tier server binary.
//!
//! Builds one cache facade over the in-memory shared store and serves it
//! through the JSON HTTP API.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use object_cache_tier::cache::store::SharedStore;
use object_cache_tier::config::{Cli, Config};
use object_cache_tier::server::api::{build_router, AppState};
use object_cache_tier::{CacheFacade, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "object_cache_tier=debug,tower_http=debug"
    } else {
        "object_cache_tier=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("object-cache-tier v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    let config = Arc::new(config);

    info!(
        salt = %config.cache.salt,
        multi_tenant = config.cache.multi_tenant,
        shared_store = config.store.enabled,
        compress_threshold = config.store.compress_threshold,
        "Configuration loaded"
    );

    // Build the cache over the shared store.
    let store: Arc<dyn SharedStore> = Arc::new(MemoryStore::new(&config.store));
    let cache = Arc::new(CacheFacade::from_config(&config, Some(store))?);

    let state = Arc::new(AppState {
        cache,
        start_time: Instant::now(),
    });

    // Build the HTTP router.
    let app = build_router(state);

    // Start the server.
    let listen_addr = config.server.listen.clone();
    info!(addr = %listen_addr, "Starting server");

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
