//! Bearer-token authentication for user-facing endpoints.
//!
//! End users and operator tooling authenticate with an HS256 JWT carrying a
//! role claim; token issuance lives outside this service. Machine-to-machine
//! callbacks authenticate with the static `X-API-Key` header instead, since
//! no user session exists for those calls.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use store::TierStore;

use common::Tier;

use crate::error::ApiError;
use crate::routes::orders::AppState;

/// Role carried in the token's `role` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Seller,
    Distributor,
    Manufacturer,
    Administrator,
}

impl Role {
    /// Whether this role may operate (accept/cancel/create) orders on the
    /// given tier. Administrators may operate everywhere; tier roles only on
    /// their own tier.
    pub fn can_operate(&self, tier: Tier) -> bool {
        match self {
            Role::Administrator => true,
            Role::Seller => tier == Tier::Seller,
            Role::Distributor => tier == Tier::Distributor,
            Role::Manufacturer => tier == Tier::Manufacturer,
        }
    }
}

/// Claims stored in the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user or service-account ID).
    pub sub: String,
    /// Role claim.
    pub role: Role,
    /// Expiry timestamp.
    pub exp: i64,
    /// Issued-at timestamp.
    pub iat: i64,
}

/// Validates incoming bearer tokens.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
}

impl JwtVerifier {
    /// Creates a verifier for tokens signed with the given secret.
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Verifies and decodes a token.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::Unauthorized(format!("Invalid token: {e}")))
    }

    /// Extracts the token from an `Authorization` header value.
    pub fn extract_bearer(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// Authenticated caller, extracted from the `Authorization: Bearer` header.
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Rejects callers whose role may not operate orders on this tier.
    pub fn require_operator(&self, tier: Tier) -> Result<(), ApiError> {
        if self.0.role.can_operate(tier) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Role {:?} may not operate orders on the {tier} tier",
                self.0.role
            )))
        }
    }
}

impl<S: TierStore + 'static> FromRequestParts<Arc<AppState<S>>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;
        let token = JwtVerifier::extract_bearer(header)
            .ok_or_else(|| ApiError::Unauthorized("Expected a bearer token".to_string()))?;
        let claims = state.verifier.verify(token)?;
        Ok(AuthUser(claims))
    }
}

/// Signs a token for the given subject and role.
///
/// Used by service-account provisioning and tests; end-user token issuance
/// belongs to the identity service, not this API.
pub fn sign_token(secret: &str, sub: &str, role: Role, ttl_minutes: i64) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: sub.to_string(),
        role,
        exp: (now + chrono::Duration::minutes(ttl_minutes)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("HS256 signing cannot fail with a valid secret")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_roundtrip() {
        let token = sign_token("test-secret", "user-1", Role::Distributor, 60);
        let claims = JwtVerifier::new("test-secret").verify(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.role, Role::Distributor);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = sign_token("test-secret", "user-1", Role::Seller, 60);
        let result = JwtVerifier::new("other-secret").verify(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = sign_token("test-secret", "user-1", Role::Seller, -5);
        let result = JwtVerifier::new("test-secret").verify(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(JwtVerifier::extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(JwtVerifier::extract_bearer("Basic abc"), None);
    }

    #[test]
    fn test_role_can_operate() {
        assert!(Role::Administrator.can_operate(Tier::Seller));
        assert!(Role::Administrator.can_operate(Tier::Manufacturer));
        assert!(Role::Distributor.can_operate(Tier::Distributor));
        assert!(!Role::Distributor.can_operate(Tier::Seller));
        assert!(!Role::Seller.can_operate(Tier::Manufacturer));
    }
}
