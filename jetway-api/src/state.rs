use async_trait::async_trait;
use jetway_core::memory::InMemoryStore;
use jetway_core::repository::{EventPublisher, FlightCatalog, SeatInventory};
use jetway_core::{BookingRules, BookingService, CoreResult};
use jetway_shared::events::{BookingEvent, SeatAvailabilityChanged};
use jetway_store::{DbClient, RedisClient};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::metrics::BookingMetrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub trust_forwarded_for: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn FlightCatalog>,
    pub seats: Arc<dyn SeatInventory>,
    pub bookings: Arc<BookingService>,
    pub db: Option<DbClient>,
    pub redis: Option<Arc<RedisClient>>,
    pub sse_tx: broadcast::Sender<SeatAvailabilityChanged>,
    pub metrics: Arc<BookingMetrics>,
    pub auth: AuthConfig,
    pub rate_limit_per_minute: i64,
}

impl AppState {
    /// Wires every repository seam to one in-memory store.
    pub fn in_memory(
        store: Arc<InMemoryStore>,
        events: Arc<dyn EventPublisher>,
        rules: BookingRules,
        auth: AuthConfig,
    ) -> Result<Self, prometheus::Error> {
        let (sse_tx, _) = broadcast::channel(100);
        let publisher = Arc::new(SeatBroadcastPublisher::new(events, sse_tx.clone()));
        let bookings = BookingService::new(store.clone(), store.clone(), store.clone(), store.clone(), publisher, rules);

        Ok(Self {
            catalog: store.clone(),
            seats: store,
            bookings: Arc::new(bookings),
            db: None,
            redis: None,
            sse_tx,
            metrics: Arc::new(BookingMetrics::new()?),
            auth,
            rate_limit_per_minute: 100,
        })
    }
}

/// Forwards booking events downstream and fans seat changes out to SSE subscribers.
pub struct SeatBroadcastPublisher {
    inner: Arc<dyn EventPublisher>,
    seat_tx: broadcast::Sender<SeatAvailabilityChanged>,
}

impl SeatBroadcastPublisher {
    pub fn new(inner: Arc<dyn EventPublisher>, seat_tx: broadcast::Sender<SeatAvailabilityChanged>) -> Self {
        Self { inner, seat_tx }
    }
}

#[async_trait]
impl EventPublisher for SeatBroadcastPublisher {
    async fn publish(&self, event: &BookingEvent) -> CoreResult<()> {
        // No subscribers is not an error.
        let _ = self.seat_tx.send(event.seat_change());
        self.inner.publish(event).await
    }
}
