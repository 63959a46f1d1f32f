//! Token issuing and request authentication.
//!
//! This module provides:
//! - [`JwtKeys`] - HS256 access/refresh token pair issuing and validation
//! - `AuthUser` - End-user authentication via Bearer access token
//! - `ServiceAuth` - Service-to-service authentication via API key
//! - `AdminAuth` - Admin key, or a Bearer token belonging to staff

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use examprep_core::{User, UserId, UserType};

use crate::crypto::constant_time_eq;
use crate::error::ApiError;
use crate::state::AppState;

/// Issuer claim stamped on every token.
const ISSUER: &str = "examprep";

/// Which half of the token pair a JWT is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived token sent on every request.
    Access,
    /// Long-lived token exchanged for a new pair.
    Refresh,
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Role at the time the token was issued.
    pub user_type: UserType,
    /// Access or refresh.
    pub typ: TokenKind,
    /// Issuer.
    pub iss: String,
    /// Issued at.
    pub iat: i64,
    /// Expiration time.
    pub exp: i64,
}

/// A freshly issued token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Always `Bearer`.
    pub token_type: &'static str,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Signing and verification keys for HS256 tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtKeys {
    /// Build keys from a shared secret.
    #[must_use]
    pub fn new(secret: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Issue an access and refresh token for `user`.
    pub fn issue(&self, user: &User) -> Result<TokenPair, ApiError> {
        Ok(TokenPair {
            access_token: self.sign(user, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.sign(user, TokenKind::Refresh, self.refresh_ttl)?,
            token_type: "Bearer",
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Validate signature, issuer, expiry and token kind.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<JwtClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);

        let claims = decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                ApiError::Unauthorized
            })?
            .claims;

        if claims.typ != kind {
            tracing::debug!(expected = ?kind, actual = ?claims.typ, "Wrong token kind");
            return Err(ApiError::Unauthorized);
        }
        Ok(claims)
    }

    fn sign(&self, user: &User, typ: TokenKind, ttl: Duration) -> Result<String, ApiError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = JwtClaims {
            sub: user.id.to_string(),
            user_type: user.user_type,
            typ,
            iss: ISSUER.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("failed to sign token: {e}")))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

/// An authenticated user extracted from a Bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
    /// Role claimed by the token.
    pub user_type: UserType,
}

impl AuthUser {
    fn from_token(token: &str, state: &AppState) -> Result<Self, ApiError> {
        let claims = state.jwt.verify(token, TokenKind::Access)?;
        let user_id = claims
            .sub
            .parse::<UserId>()
            .map_err(|_| ApiError::Unauthorized)?;

        Ok(Self {
            user_id,
            user_type: claims.user_type,
        })
    }
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;
            Self::from_token(token, state)
        })
    }
}

/// Service authentication via API key.
///
/// Used by internal services that deduct credits on a user's behalf.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let api_key = header(parts, "x-api-key").ok_or(ApiError::Unauthorized)?;

            let expected_key = state
                .config
                .service_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if !constant_time_eq(api_key, expected_key) {
                return Err(ApiError::Unauthorized);
            }

            let service_name = header(parts, "x-service-name")
                .unwrap_or("unknown")
                .to_string();

            Ok(ServiceAuth { service_name })
        })
    }
}

/// Admin authentication.
///
/// Accepts either the `X-Admin-Key` header (with an optional `X-Admin-Id`)
/// or a Bearer access token whose role is admin or content manager.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
    /// The admin's user ID, when known. Recorded as `updated_by`.
    pub user_id: Option<UserId>,
}

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            if let Some(admin_key) = header(parts, "x-admin-key") {
                let expected_key = state
                    .config
                    .admin_api_key
                    .as_ref()
                    .ok_or(ApiError::Unauthorized)?;

                if !constant_time_eq(admin_key, expected_key) {
                    return Err(ApiError::Unauthorized);
                }

                let admin_id = header(parts, "x-admin-id").unwrap_or("admin").to_string();
                // Only a registered user can be recorded as `updated_by`.
                let user_id = match admin_id.parse::<UserId>() {
                    Ok(id) => state.store.get_user(&id).await?.map(|user| user.id),
                    Err(_) => None,
                };

                tracing::info!(admin_id = %admin_id, "Admin authenticated by key");
                return Ok(AdminAuth { admin_id, user_id });
            }

            let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

            let user = AuthUser::from_token(token, state)?;
            if !user.user_type.is_staff() {
                return Err(ApiError::Forbidden);
            }

            tracing::info!(admin_id = %user.user_id, "Admin authenticated by token");
            Ok(AdminAuth {
                admin_id: user.user_id.to_string(),
                user_id: Some(user.user_id),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> JwtKeys {
        JwtKeys::new(
            "test-secret",
            Duration::from_secs(900),
            Duration::from_secs(7 * 24 * 3600),
        )
    }

    #[test]
    fn issued_tokens_verify_as_their_kind() {
        let keys = keys();
        let user = User::new_student(Some("a@b.co".into()), None, "a".into());
        let pair = keys.issue(&user).unwrap();

        let access = keys.verify(&pair.access_token, TokenKind::Access).unwrap();
        assert_eq!(access.sub, user.id.to_string());
        assert_eq!(access.user_type, UserType::Student);
        assert_eq!(access.exp - access.iat, 900);

        let refresh = keys.verify(&pair.refresh_token, TokenKind::Refresh).unwrap();
        assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn token_kinds_are_not_interchangeable() {
        let keys = keys();
        let user = User::new_student(None, Some("+919876543210".into()), "Student".into());
        let pair = keys.issue(&user).unwrap();

        assert!(keys.verify(&pair.refresh_token, TokenKind::Access).is_err());
        assert!(keys.verify(&pair.access_token, TokenKind::Refresh).is_err());
    }

    #[test]
    fn foreign_and_expired_tokens_are_rejected() {
        let user = User::new_student(Some("a@b.co".into()), None, "a".into());
        let other = JwtKeys::new("other-secret", Duration::from_secs(60), Duration::from_secs(60));
        let pair = other.issue(&user).unwrap();
        assert!(keys().verify(&pair.access_token, TokenKind::Access).is_err());

        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            sub: user.id.to_string(),
            user_type: UserType::Student,
            typ: TokenKind::Access,
            iss: ISSUER.to_string(),
            iat: now - 3600,
            exp: now - 1800,
        };
        let expired = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        assert!(keys().verify(&expired, TokenKind::Access).is_err());
    }
}
