pub mod auth;

pub use auth::{AdminCaller, Caller, CustomerClaims};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jetway_store::redis_repo::rate_limit_key;

use crate::state::AppState;

/// Per-client fixed window of one minute. Passes everything through when Redis
/// is not configured or unreachable.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(req).await;
    };

    let ip = auth::client_ip(req.headers(), req.extensions(), state.auth.trust_forwarded_for)
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    match redis
        .check_rate_limit(&rate_limit_key(&ip), state.rate_limit_per_minute, 60)
        .await
    {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!(client = %ip, "Rate limit exceeded");
            (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response()
        }
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
