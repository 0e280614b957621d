use axum::{extract::State, routing::post, Json, Router};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{CustomerClaims, ROLE_GUEST},
    state::AppState,
};

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/guest", post(login_guest))
}

/// Each call mints a fresh guest identity, so guests never share surge history.
async fn login_guest(State(state): State<AppState>) -> Result<Json<AuthResponse>, AppError> {
    let claims = CustomerClaims {
        sub: format!("guest-{}", Uuid::new_v4()),
        email: None,
        role: ROLE_GUEST.to_owned(),
        exp: (Utc::now() + Duration::seconds(state.auth.expiration as i64)).timestamp() as usize,
    };
    let token = issue_token(&claims, &state.auth.secret)?;
    Ok(Json(AuthResponse { token }))
}

pub fn issue_token(claims: &CustomerClaims, secret: &str) -> Result<String, AppError> {
    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}
