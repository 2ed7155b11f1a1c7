// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Access-token codec and opaque refresh-token minting.
//!
//! Access tokens are HS256 JWTs with a fixed claim shape; refresh tokens
//! are opaque uuid strings whose state lives entirely in the token store.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use corvus_core::{CorvusError, UserRole};

/// Claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub role: UserRole,
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

/// Mints and validates token pairs.
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtManager {
    pub fn new(secret: &str, issuer: &str, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer: issuer.to_string(),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Signs an access token for the user.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        role: UserRole,
    ) -> Result<String, CorvusError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            user_id,
            role,
            iss: self.issuer.clone(),
            sub: user_id.to_string(),
            iat: now,
            nbf: now,
            exp: now + self.access_ttl.as_secs() as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| CorvusError::Internal(format!("failed to sign access token: {e}")))
    }

    /// Mints an opaque refresh token value.
    pub fn generate_refresh_token(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Verifies signature, expiry, not-before, and issuer.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, CorvusError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_nbf = true;

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| CorvusError::InvalidToken)
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(
            "test-secret",
            "corvus-auth",
            Duration::from_secs(900),
            Duration::from_secs(30 * 24 * 3600),
        )
    }

    #[test]
    fn access_token_round_trips() {
        let m = manager();
        let user_id = Uuid::new_v4();
        let token = m.generate_access_token(user_id, UserRole::Admin).unwrap();

        let claims = m.validate_access_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.iss, "corvus-auth");
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn tampered_token_is_invalid() {
        let m = manager();
        let token = m
            .generate_access_token(Uuid::new_v4(), UserRole::User)
            .unwrap();
        let mut tampered = token.clone();
        tampered.push('x');

        let err = m.validate_access_token(&tampered).unwrap_err();
        assert!(matches!(err, CorvusError::InvalidToken));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let m = manager();
        let token = m
            .generate_access_token(Uuid::new_v4(), UserRole::User)
            .unwrap();

        let other = JwtManager::new(
            "different-secret",
            "corvus-auth",
            Duration::from_secs(900),
            Duration::from_secs(3600),
        );
        assert!(other.validate_access_token(&token).is_err());
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let m = manager();
        let token = m
            .generate_access_token(Uuid::new_v4(), UserRole::User)
            .unwrap();

        let other = JwtManager::new(
            "test-secret",
            "someone-else",
            Duration::from_secs(900),
            Duration::from_secs(3600),
        );
        assert!(other.validate_access_token(&token).is_err());
    }

    #[test]
    fn refresh_tokens_are_unique_and_opaque() {
        let m = manager();
        let a = m.generate_refresh_token();
        let b = m.generate_refresh_token();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
