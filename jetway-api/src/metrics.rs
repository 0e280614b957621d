use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

use crate::state::AppState;

/// Booking counters, registered on a private registry so test apps don't clash.
pub struct BookingMetrics {
    registry: Registry,
    pub bookings_created: IntCounter,
    pub bookings_cancelled: IntCounter,
    pub surge_applied: IntCounter,
    pub seat_conflicts: IntCounter,
}

impl BookingMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| -> Result<IntCounter, prometheus::Error> {
            let c = IntCounter::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(c.clone()))?;
            Ok(c)
        };

        Ok(Self {
            bookings_created: counter("jetway_bookings_created_total", "Bookings confirmed")?,
            bookings_cancelled: counter("jetway_bookings_cancelled_total", "Bookings cancelled")?,
            surge_applied: counter("jetway_surge_applied_total", "Bookings priced with surge")?,
            seat_conflicts: counter("jetway_seat_conflicts_total", "Bookings rejected on a taken seat")?,
            registry,
        })
    }

    pub fn encode_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match state.metrics.encode_text() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
