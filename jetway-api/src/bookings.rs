use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use jetway_core::models::BookingRecord;
use jetway_core::{CancelOutcome, CoreError, CreateBooking};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{ApiJson, ApiPath},
    middleware::Caller,
    state::AppState,
};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub released_seat_ids: Vec<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_my_bookings).post(create_booking))
        .route("/bookings/{id}", get(get_booking))
        .route("/bookings/{id}/cancel", patch(cancel_booking))
}

// ============================================================================
// Handlers
// ============================================================================

async fn create_booking(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiJson(req): ApiJson<CreateBooking>,
) -> Result<(StatusCode, Json<BookingRecord>), AppError> {
    let flight_id = req.flight_id;
    match state.bookings.create_booking(req, &requester.key).await {
        Ok(record) => {
            state.metrics.bookings_created.inc();
            if record.booking.surge_applied {
                state.metrics.surge_applied.inc();
            }
            Ok((StatusCode::CREATED, Json(record)))
        }
        Err(e) => {
            if matches!(e, CoreError::SeatAlreadyTaken(_)) {
                state.metrics.seat_conflicts.inc();
            }
            info!(%flight_id, requester = %requester.key, "Booking rejected: {}", e);
            Err(e.into())
        }
    }
}

async fn list_my_bookings(
    State(state): State<AppState>,
    Caller(requester): Caller,
) -> Result<Json<Vec<BookingRecord>>, AppError> {
    Ok(Json(state.bookings.list_bookings_for(&requester.key).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<BookingRecord>, AppError> {
    Ok(Json(state.bookings.get_booking(id, &requester).await?))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Caller(requester): Caller,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let response = match state.bookings.cancel_booking(id, &requester).await? {
        CancelOutcome::Cancelled { released_seats } => {
            state.metrics.bookings_cancelled.inc();
            CancelResponse {
                message: "Booking cancelled successfully".to_string(),
                released_seat_ids: released_seats,
            }
        }
        CancelOutcome::AlreadyCancelled => CancelResponse {
            message: "Booking already cancelled".to_string(),
            released_seat_ids: Vec::new(),
        },
    };
    Ok(Json(response))
}
