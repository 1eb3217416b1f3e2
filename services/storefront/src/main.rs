use anyhow::{Context, Result};
use common::{
    RecordStore,
    cache::{MemoryCache, RedisConfig, RedisPool, SessionCache},
    store::{MemoryRecordStore, StoreConfig},
};
use storefront::{
    AppState,
    config::{AppConfig, CacheBackend, StoreBackend},
    create_router,
};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting storefront service");

    let config = AppConfig::load().context("Failed to load storefront settings")?;

    let store = match config.store.backend {
        StoreBackend::Http => {
            let store_config = StoreConfig::from_env()?;
            info!("Using record store at {}", store_config.base_url);
            RecordStore::http(&store_config)?
        }
        StoreBackend::Memory => match &config.store.seed_file {
            Some(path) => {
                info!("Using in-process record store seeded from {}", path);
                RecordStore::Memory(MemoryRecordStore::from_file(path)?)
            }
            None => {
                warn!("Using an empty in-process record store; data is lost on exit");
                RecordStore::Memory(MemoryRecordStore::new())
            }
        },
    };

    let cache = match config.cache.backend {
        CacheBackend::Redis => {
            let redis_config = RedisConfig::from_env()?;
            let pool = RedisPool::new(&redis_config).await?;
            if !pool.health_check().await? {
                anyhow::bail!("Failed to connect to Redis");
            }
            info!("Redis connection successful");
            SessionCache::Redis(pool)
        }
        CacheBackend::Memory => {
            warn!("Using in-process session cache; sessions are lost on exit");
            SessionCache::Memory(MemoryCache::new())
        }
    };

    let state = AppState::new(store, cache, config.session.ttl_seconds);
    let app = create_router(state);

    let address = config.server.address();
    let listener = TcpListener::bind(&address).await?;
    info!("Storefront service listening on {}", address);

    axum::serve(listener, app).await?;

    Ok(())
}
