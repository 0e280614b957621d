use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use jetway_core::models::{Airline, Airport, FlightDetails, Seat};
use jetway_core::search::FlightSearchQuery;
use jetway_core::CoreError;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{
    error::AppError,
    extract::{ApiPath, ApiQuery},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/airports", get(list_airports))
        .route("/airlines", get(list_airlines))
        .route("/flights/search", get(search_flights))
        .route("/flights/{id}", get(get_flight))
        .route("/flights/{id}/seats", get(get_seats))
        .route("/flights/{id}/seats/stream", get(stream_seats))
}

async fn list_airports(State(state): State<AppState>) -> Result<Json<Vec<Airport>>, AppError> {
    Ok(Json(state.catalog.list_airports().await?))
}

async fn list_airlines(State(state): State<AppState>) -> Result<Json<Vec<Airline>>, AppError> {
    Ok(Json(state.catalog.list_airlines().await?))
}

async fn search_flights(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<FlightSearchQuery>,
) -> Result<Json<Vec<FlightDetails>>, AppError> {
    let flights = state.catalog.search_flights(&query).await?;
    tracing::debug!(
        origin = %query.origin,
        destination = %query.destination,
        date = %query.date,
        results = flights.len(),
        "Flight search"
    );
    Ok(Json(flights))
}

async fn get_flight(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<FlightDetails>, AppError> {
    let flight = state.catalog.get_flight(id).await?.ok_or(CoreError::FlightNotFound(id))?;
    Ok(Json(flight))
}

async fn get_seats(State(state): State<AppState>, ApiPath(id): ApiPath<Uuid>) -> Result<Json<Vec<Seat>>, AppError> {
    if state.catalog.get_flight(id).await?.is_none() {
        return Err(CoreError::FlightNotFound(id).into());
    }
    Ok(Json(state.seats.seats_for_flight(id).await?))
}

/// Live seat-map updates for one flight.
async fn stream_seats(
    State(state): State<AppState>,
    ApiPath(flight_id): ApiPath<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.catalog.get_flight(flight_id).await?.is_none() {
        return Err(CoreError::FlightNotFound(flight_id).into());
    }

    let rx = state.sse_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        // Lagged receivers skip what they missed; clients refetch the seat map.
        let change = result.ok().filter(|c| c.flight_id == flight_id)?;
        let event = Event::default().event("seat_availability").json_data(&change).ok()?;
        Some(Ok::<_, Infallible>(event))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
