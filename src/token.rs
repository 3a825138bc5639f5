/// Signed access and refresh tokens
///
/// Both variants carry the same `{userId, email, role}` claims but are signed
/// with distinct secrets and expire independently, so a refresh token can
/// never be replayed as an access token.
use crate::{
    config::AuthConfig,
    db::user::{Role, User},
    error::{AuthError, AuthResult},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl TokenClaims {
    pub fn for_user(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Wire format: identity claims plus registered time claims
#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    #[serde(flatten)]
    identity: TokenClaims,
    iat: i64,
    exp: i64,
}

/// A freshly issued access/refresh pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies tokens. Pure: no I/O beyond local signing.
pub struct TokenService {
    access: SigningKeys,
    refresh: SigningKeys,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            access: SigningKeys::new(&config.jwt_secret, config.access_ttl()),
            refresh: SigningKeys::new(&config.jwt_refresh_secret, config.refresh_ttl()),
            validation,
        }
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue_access_token(&self, claims: &TokenClaims) -> AuthResult<String> {
        self.issue(claims, TokenKind::Access)
    }

    pub fn issue_refresh_token(&self, claims: &TokenClaims) -> AuthResult<String> {
        self.issue(claims, TokenKind::Refresh)
    }

    /// Issue both variants for the same claims
    pub fn issue_pair(&self, claims: &TokenClaims) -> AuthResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.issue_access_token(claims)?,
            refresh_token: self.issue_refresh_token(claims)?,
        })
    }

    fn issue(&self, claims: &TokenClaims, kind: TokenKind) -> AuthResult<String> {
        let keys = self.keys(kind);
        let now = Utc::now().timestamp();
        let jwt_claims = JwtClaims {
            identity: claims.clone(),
            iat: now,
            exp: now + keys.ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &jwt_claims, &keys.encoding)
            .map_err(|e| AuthError::Jwt(format!("Failed to generate {:?} token: {}", kind, e)))
    }

    /// Verify a token of the given variant and return its identity claims.
    ///
    /// Every failure (bad signature, malformed, expired, wrong variant) maps to
    /// the same `InvalidToken`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> AuthResult<TokenClaims> {
        decode::<JwtClaims>(token, &self.keys(kind).decoding, &self.validation)
            .map(|data| data.claims.identity)
            .map_err(|e| {
                tracing::debug!(kind = ?kind, reason = %e, "Token verification failed");
                AuthError::InvalidToken
            })
    }

    /// Lifetime of a variant, shared with the matching cookie's max-age
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        self.keys(kind).ttl
    }
}
