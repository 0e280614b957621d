use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jetway_core::{Requester, UserKey};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use crate::{error::AppError, state::AppState};

pub const ROLE_GUEST: &str = "GUEST";
pub const ROLE_CUSTOMER: &str = "CUSTOMER";
pub const ROLE_ADMIN: &str = "ADMIN";
pub const ROLE_SUPER_ADMIN: &str = "SUPER_ADMIN";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CustomerClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    pub exp: usize,
}

impl CustomerClaims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN || self.role == ROLE_SUPER_ADMIN
    }

    pub fn user_key(&self) -> UserKey {
        if self.role == ROLE_GUEST {
            UserKey::guest(&self.sub)
        } else {
            UserKey::user(&self.sub)
        }
    }

    pub fn requester(&self) -> Requester {
        if self.is_admin() {
            Requester::admin(self.user_key())
        } else {
            Requester::new(self.user_key())
        }
    }
}

pub fn decode_claims(token: &str, secret: &str) -> Result<CustomerClaims, AppError> {
    decode::<CustomerClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::AuthenticationError("Invalid or expired token".to_string())
        })
}

/// Peer address of the caller. `X-Forwarded-For` is consulted only when the
/// deployment trusts it, and only a value that parses as an IP is accepted.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

// ============================================================================
// Extractors
// ============================================================================

/// Whoever is calling: a token holder, or an anonymous caller keyed by client address.
pub struct Caller(pub Requester);

impl FromRequestParts<AppState> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
            Ok(TypedHeader(Authorization(bearer))) => {
                let claims = decode_claims(bearer.token(), &state.auth.secret)?;
                Ok(Caller(claims.requester()))
            }
            Err(rejection) if rejection.is_missing() => {
                let ip = client_ip(&parts.headers, &parts.extensions, state.auth.trust_forwarded_for);
                Ok(Caller(Requester::new(UserKey::anonymous(ip))))
            }
            Err(_) => Err(AppError::AuthenticationError("Malformed Authorization header".to_string())),
        }
    }
}

/// A caller holding an `ADMIN` or `SUPER_ADMIN` token.
pub struct AdminCaller(pub Requester);

impl FromRequestParts<AppState> for AdminCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::AuthenticationError("Missing bearer token".to_string()))?;

        let claims = decode_claims(bearer.token(), &state.auth.secret)?;
        if !claims.is_admin() {
            return Err(AppError::AuthorizationError("Admin role required".to_string()));
        }
        Ok(AdminCaller(claims.requester()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn claims(role: &str) -> CustomerClaims {
        CustomerClaims {
            sub: "abc".into(),
            email: None,
            role: role.into(),
            exp: 0,
        }
    }

    #[test]
    fn test_user_keys_by_role() {
        assert_eq!(claims(ROLE_GUEST).user_key().as_str(), "guest:abc");
        assert_eq!(claims(ROLE_CUSTOMER).user_key().as_str(), "user:abc");
        assert!(claims(ROLE_ADMIN).requester().is_admin);
        assert!(!claims(ROLE_CUSTOMER).requester().is_admin);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header_when_trusted() {
        let mut headers = HeaderMap::new();
        let mut extensions = Extensions::new();
        assert_eq!(client_ip(&headers, &extensions, true), None);

        extensions.insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 7], 4000))));
        let peer: IpAddr = "10.0.0.7".parse().unwrap();
        assert_eq!(client_ip(&headers, &extensions, true), Some(peer));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip(&headers, &extensions, true), Some("203.0.113.9".parse().unwrap()));
        assert_eq!(client_ip(&headers, &extensions, false), Some(peer));
    }

    #[test]
    fn test_client_ip_ignores_non_address_forwarded_values() {
        let mut headers = HeaderMap::new();
        let mut extensions = Extensions::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("guest-3f1c9a"));
        assert_eq!(client_ip(&headers, &extensions, true), None);

        extensions.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 5000))));
        assert_eq!(client_ip(&headers, &extensions, true), Some("192.168.1.20".parse().unwrap()));
    }
}
