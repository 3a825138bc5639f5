/// Authentication extractors and utilities
use crate::{
    context::AppContext,
    error::AuthError,
    session::ClientInfo,
    token::{TokenClaims, TokenKind},
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

/// Access token cookie
pub const ACCESS_COOKIE: &str = "token";
/// Refresh token cookie
pub const REFRESH_COOKIE: &str = "refreshToken";
/// Session id cookie
pub const SESSION_COOKIE: &str = "sessionId";

const UNKNOWN: &str = "unknown";

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Access token from the cookie, falling back to the Authorization header
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(ACCESS_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
        .or_else(|| extract_bearer_token(headers))
}

/// Authenticated caller, from a verified access token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub claims: TokenClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_access_token(&parts.headers)
            .ok_or_else(|| AuthError::Unauthorized("Not authenticated".to_string()))?;

        let claims = state.tokens.verify(&token, TokenKind::Access)?;

        Ok(AuthContext { claims })
    }
}

/// Optional authenticated context - does not fail if no auth provided
#[derive(Debug, Clone)]
pub struct OptionalAuthContext {
    pub auth: Option<AuthContext>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthContext {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let auth = extract_access_token(&parts.headers)
            .and_then(|token| state.tokens.verify(&token, TokenKind::Access).ok())
            .map(|claims| AuthContext { claims });

        Ok(OptionalAuthContext { auth })
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`
pub fn client_ip(headers: &HeaderMap) -> String {
    header_value(headers, "x-forwarded-for")
        .and_then(|forwarded| {
            forwarded
                .split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
        .or_else(|| header_value(headers, "x-real-ip"))
        .unwrap_or_else(|| UNKNOWN.to_string())
}

pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        ip_address: Some(client_ip(headers)),
        user_agent: Some(
            header_value(headers, "user-agent").unwrap_or_else(|| UNKNOWN.to_string()),
        ),
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(client_info(&parts.headers))
    }
}
