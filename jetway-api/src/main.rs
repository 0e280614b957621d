use anyhow::Context;
use jetway_api::{
    app,
    metrics::BookingMetrics,
    state::{AppState, AuthConfig, SeatBroadcastPublisher},
};
use jetway_core::memory::InMemoryStore;
use jetway_core::repository::{EventPublisher, FlightCatalog, LogPublisher, SeatInventory};
use jetway_core::BookingService;
use jetway_store::app_config::{Config, StorageBackend};
use jetway_store::seed::{demo_catalog, seed_memory, seed_postgres};
use jetway_store::{DbClient, EventProducer, PgAttemptLog, PgBookingStore, PgFlightCatalog, RedisClient};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SEED_DAYS: u32 = 14;

type Backends = (Arc<dyn FlightCatalog>, Arc<dyn SeatInventory>, BookingService, Option<DbClient>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "jetway_api=debug,jetway_core=debug,jetway_store=debug,tower_http=debug".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Jetway API on port {} ({:?} storage)", config.server.port, config.storage.backend);

    let redis = match &config.redis {
        Some(redis) => match RedisClient::new(&redis.url).await {
            Ok(client) => {
                if let Err(e) = client.ping().await {
                    tracing::warn!("Redis not reachable yet, rate limiter will fail open: {}", e);
                }
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, rate limiting disabled: {}", e);
                None
            }
        },
        None => None,
    };

    let downstream: Arc<dyn EventPublisher> = match &config.kafka {
        Some(kafka) => Arc::new(EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?),
        None => Arc::new(LogPublisher),
    };

    let (sse_tx, _) = tokio::sync::broadcast::channel(100);
    let events = Arc::new(SeatBroadcastPublisher::new(downstream, sse_tx.clone()));
    let rules = config.business_rules.booking_rules();
    let first_day = chrono::Utc::now().date_naive();

    let (catalog, seats, bookings, db): Backends = match config.storage.backend {
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database).await.context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            if config.database.seed_on_startup {
                seed_postgres(&db.pool, demo_catalog(first_day, SEED_DAYS))
                    .await
                    .map_err(|e| anyhow::anyhow!("Seeding failed: {}", e))?;
            }

            let flights = Arc::new(PgFlightCatalog::new(db.pool.clone()));
            let service = BookingService::new(
                flights.clone(),
                flights.clone(),
                Arc::new(PgBookingStore::new(db.pool.clone())),
                Arc::new(PgAttemptLog::new(db.pool.clone())),
                events,
                rules,
            );
            (flights.clone() as Arc<dyn FlightCatalog>, flights as Arc<dyn SeatInventory>, service, Some(db))
        }
        StorageBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            seed_memory(&store, demo_catalog(first_day, SEED_DAYS));
            let service = BookingService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                store.clone(),
                events,
                rules,
            );
            (store.clone() as Arc<dyn FlightCatalog>, store as Arc<dyn SeatInventory>, service, None)
        }
    };

    let app_state = AppState {
        catalog,
        seats,
        bookings: Arc::new(bookings),
        db,
        redis,
        sse_tx,
        metrics: Arc::new(BookingMetrics::new().context("Failed to register metrics")?),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            trust_forwarded_for: config.server.trust_forwarded_for,
        },
        rate_limit_per_minute: config.business_rules.rate_limit_per_minute,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
