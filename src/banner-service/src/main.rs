//! Banner Service — serves promotional banners by feature and tag.
//!
//! Main entry point that initializes the stores, starts the cache refresh
//! scheduler and serves the HTTP API until Ctrl-C.

use banner_api::{ApiServer, AppState};
use banner_cache::{CacheStore, LocalCache, RedisCache};
use banner_core::config::{AppConfig, CacheBackend};
use banner_store::InMemoryStore;
use banner_sync::{BannerResolver, CacheWarmer, RefreshScheduler};
use clap::Parser;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Every workspace crate logs at info unless `RUST_LOG` says otherwise.
const DEFAULT_LOG_FILTER: &str = "banner_service=info,banner_api=info,banner_sync=info,\
banner_cache=info,banner_store=info,banner_core=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "banner-service")]
#[command(about = "Banner delivery service with a periodically refreshed cache")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "BANNER_SERVICE__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "BANNER_SERVICE__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Use Redis as the cache store instead of the in-process cache
    #[arg(long, default_value_t = false)]
    redis: bool,

    /// Seconds between cache refresh passes (overrides config)
    #[arg(long, env = "BANNER_SERVICE__REFRESH__INTERVAL_SECS")]
    refresh_interval_secs: Option<u64>,

    /// Disable the background cache refresh
    #[arg(long, default_value_t = false)]
    no_refresh: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Banner Service starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if cli.redis {
        config.cache.backend = CacheBackend::Redis;
    }
    if let Some(secs) = cli.refresh_interval_secs {
        config.refresh.interval_secs = secs;
    }
    if cli.no_refresh {
        config.refresh.enabled = false;
    }

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        cache_backend = ?config.cache.backend,
        cache_ttl_secs = config.cache.ttl_secs,
        refresh_interval_secs = config.refresh.interval_secs,
        "Configuration loaded"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Initialize record store
    let store = Arc::new(InMemoryStore::new());
    if config.auth.seed_default_tokens {
        store.seed_default_tokens().await?;
    }

    // Initialize cache store
    let cache: Arc<dyn CacheStore> = match config.cache.backend {
        CacheBackend::Redis => match RedisCache::new(&config.redis).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                error!(error = %e, "Failed to connect to Redis, falling back to local cache");
                local_cache(&config, shutdown_rx.clone())
            }
        },
        CacheBackend::Local => local_cache(&config, shutdown_rx.clone()),
    };

    let op_timeout = config.refresh.op_timeout();
    let resolver = Arc::new(BannerResolver::new(store.clone(), cache.clone(), op_timeout));

    // Start the cache refresh scheduler
    let scheduler = if config.refresh.enabled {
        let warmer = Arc::new(CacheWarmer::new(
            store.clone(),
            cache.clone(),
            config.cache.ttl(),
            op_timeout,
        ));
        Some(RefreshScheduler::new(warmer, config.refresh.interval()).spawn(shutdown_rx.clone()))
    } else {
        info!("Cache refresh disabled, use_last_revision lookups fall back to the record store");
        None
    };

    let state = AppState {
        resolver,
        banners: store.clone(),
        tokens: store,
        node_id: config.node_id.clone(),
        start_time: Instant::now(),
    };
    let api_server = ApiServer::new(config.clone(), state);

    // Start metrics exporter
    if config.metrics.enabled {
        if let Err(e) = api_server.start_metrics() {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
        let _ = shutdown_tx.send(true);
    });

    info!("Banner Service is ready to serve traffic");

    // Start HTTP server (blocks until shutdown)
    api_server.start_http(shutdown_rx).await?;

    if let Some(handle) = scheduler {
        match handle.await {
            Ok(stats) => info!(passes = stats.passes, failed = stats.failed_passes, "Refresh scheduler joined"),
            Err(e) => error!(error = %e, "Refresh scheduler task panicked"),
        }
    }

    info!("Banner Service stopped");
    Ok(())
}

/// Build the in-process cache and its expiry sweeper.
fn local_cache(config: &AppConfig, mut shutdown_rx: watch::Receiver<bool>) -> Arc<dyn CacheStore> {
    let cache = Arc::new(LocalCache::new(config.cache.max_entries));

    let sweeper = cache.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = interval.tick() => {
                    let evicted = sweeper.evict_expired();
                    if evicted > 0 {
                        debug!(evicted = evicted, "Local cache eviction complete");
                    }
                }
            }
        }
    });

    cache
}
