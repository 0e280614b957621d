use axum::{extract::State, routing::get, Json, Router};
use jetway_core::models::{BookingRecord, FlightDetails};

use crate::{error::AppError, middleware::AdminCaller, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/flights", get(list_flights))
        .route("/admin/bookings", get(list_bookings))
}

async fn list_flights(
    State(state): State<AppState>,
    AdminCaller(_admin): AdminCaller,
) -> Result<Json<Vec<FlightDetails>>, AppError> {
    Ok(Json(state.catalog.list_flights().await?))
}

async fn list_bookings(
    State(state): State<AppState>,
    AdminCaller(admin): AdminCaller,
) -> Result<Json<Vec<BookingRecord>>, AppError> {
    let bookings = state.bookings.list_all_bookings().await?;
    tracing::debug!(admin = %admin.key, count = bookings.len(), "Admin booking listing");
    Ok(Json(bookings))
}
