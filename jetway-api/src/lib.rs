use axum::{extract::State, http::Method, http::StatusCode, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod extract;
pub mod flights;
pub mod metrics;
pub mod middleware;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(auth::routes())
        .merge(flights::routes())
        .merge(bookings::routes())
        .merge(admin::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit_middleware,
        ))
        .with_state(state)
}

/// Reports each configured backing service; 503 when any of them is down.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let database = match &state.db {
        Some(db) => service_state(db.ping().await, "database"),
        None => "disabled",
    };
    let redis = match &state.redis {
        Some(redis) => service_state(redis.ping().await, "redis"),
        None => "disabled",
    };

    let healthy = database != "down" && redis != "down";
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let body = json!({
        "status": if healthy { "ok" } else { "degraded" },
        "database": database,
        "redis": redis,
    });
    (status, Json(body))
}

fn service_state<E: std::fmt::Display>(result: Result<(), E>, service: &str) -> &'static str {
    match result {
        Ok(()) => "up",
        Err(e) => {
            tracing::warn!("Health check: {} unreachable: {}", service, e);
            "down"
        }
    }
}
