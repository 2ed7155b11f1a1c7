// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication business logic.
//!
//! Login and refresh collapse every lookup or verification failure to
//! `invalid_credentials` (or `invalid_token`) before returning, so the
//! reply never reveals whether an account exists. Refresh is rotating:
//! the new pair is stored before the old token is deleted, so at no
//! point are both tokens unusable.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use corvus_core::{CorvusError, RefreshToken, UserRepository};

use crate::jwt::{AccessClaims, JwtManager};
use crate::password::{hash_password, verify_password};
use crate::token_store::TokenStore;

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login inputs, including client metadata recorded on the session.
#[derive(Debug, Clone, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
}

/// Refresh inputs; metadata describes the device performing the rotation.
#[derive(Debug, Clone, Default)]
pub struct RefreshRequest {
    pub refresh_token: String,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
}

/// Password change inputs.
#[derive(Debug, Clone)]
pub struct ChangePasswordRequest {
    pub user_id: Uuid,
    pub old_password: String,
    pub new_password: String,
}

/// Authentication service over the user repository and token store.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    tokens: TokenStore,
    jwt: JwtManager,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, tokens: TokenStore, jwt: JwtManager) -> Self {
        Self { users, tokens, jwt }
    }

    /// Authenticates a user and mints a token pair.
    pub async fn login(&self, req: LoginRequest) -> Result<(TokenPair, Uuid), CorvusError> {
        let user = self
            .users
            .get_by_email(&req.email)
            .await
            .map_err(|_| CorvusError::InvalidCredentials)?;

        if !user.is_active {
            return Err(CorvusError::UserNotActive);
        }

        if !verify_password(&req.password, &user.password_hash) {
            return Err(CorvusError::InvalidCredentials);
        }

        let access_token = self.jwt.generate_access_token(user.id, user.role)?;
        let refresh_token = self.jwt.generate_refresh_token();

        let record = RefreshToken {
            token: refresh_token.clone(),
            user_id: user.id,
            device_id: req.device_id,
            user_agent: req.user_agent,
            ip_address: req.ip_address,
            expires_at: Utc::now()
                + chrono::Duration::from_std(self.jwt.refresh_ttl())
                    .unwrap_or_else(|_| chrono::Duration::days(30)),
            created_at: Utc::now(),
        };
        self.tokens.store(&record, self.jwt.refresh_ttl()).await?;

        Ok((
            TokenPair {
                access_token,
                refresh_token,
            },
            user.id,
        ))
    }

    /// Rotates a refresh token: mints a new pair and kills the old token.
    ///
    /// Ordered store-new then delete-old. If the delete fails after the
    /// store succeeded, the old token remains valid and the client simply
    /// retries; there is never a window with zero usable tokens.
    pub async fn refresh(&self, req: RefreshRequest) -> Result<(TokenPair, Uuid), CorvusError> {
        let stored = self
            .tokens
            .get_by_value(&req.refresh_token)
            .await
            .map_err(|_| CorvusError::InvalidToken)?;

        if Utc::now() >= stored.expires_at {
            // Dead token: clean it up and tell the caller.
            let _ = self.tokens.delete(stored.user_id, &stored.token).await;
            return Err(CorvusError::ExpiredToken);
        }

        let user = self
            .users
            .get_by_id(stored.user_id)
            .await
            .map_err(|_| CorvusError::UserNotFound)?;
        if !user.is_active {
            return Err(CorvusError::UserNotActive);
        }

        let access_token = self.jwt.generate_access_token(user.id, user.role)?;
        let new_refresh = self.jwt.generate_refresh_token();

        let record = RefreshToken {
            token: new_refresh.clone(),
            user_id: user.id,
            device_id: req.device_id,
            user_agent: req.user_agent,
            ip_address: req.ip_address,
            expires_at: Utc::now()
                + chrono::Duration::from_std(self.jwt.refresh_ttl())
                    .unwrap_or_else(|_| chrono::Duration::days(30)),
            created_at: Utc::now(),
        };
        self.tokens.store(&record, self.jwt.refresh_ttl()).await?;
        self.tokens.delete(stored.user_id, &stored.token).await?;

        Ok((
            TokenPair {
                access_token,
                refresh_token: new_refresh,
            },
            user.id,
        ))
    }

    /// Verifies an access token and re-checks the user's state.
    pub async fn validate_access(&self, token: &str) -> Result<AccessClaims, CorvusError> {
        let claims = self.jwt.validate_access_token(token)?;

        let user = self
            .users
            .get_by_id(claims.user_id)
            .await
            .map_err(|_| CorvusError::InvalidToken)?;
        if !user.is_active {
            return Err(CorvusError::InvalidToken);
        }

        Ok(claims)
    }

    /// Revokes a single refresh token (one device).
    ///
    /// The token must belong to `user_id`; a token that is already gone
    /// is a no-op so repeated logouts stay idempotent.
    pub async fn logout(&self, user_id: Uuid, token: &str) -> Result<(), CorvusError> {
        match self.tokens.get_by_value(token).await {
            Ok(record) if record.user_id != user_id => return Err(CorvusError::Unauthorized),
            Ok(_) => {}
            Err(CorvusError::TokenNotFound) => return Ok(()),
            Err(e) => return Err(e),
        }
        self.tokens.delete(user_id, token).await
    }

    /// Revokes every refresh token the user owns.
    pub async fn logout_all(&self, user_id: Uuid) -> Result<(), CorvusError> {
        self.tokens.delete_all(user_id).await
    }

    /// Changes the password and revokes all sessions (best effort).
    pub async fn change_password(&self, req: ChangePasswordRequest) -> Result<(), CorvusError> {
        let user = self.users.get_by_id(req.user_id).await?;

        if !verify_password(&req.old_password, &user.password_hash) {
            return Err(CorvusError::InvalidCredentials);
        }

        let new_hash = hash_password(&req.new_password)?;
        self.users.update_password(req.user_id, &new_hash).await?;

        // Session revocation failures must not fail the password change.
        if let Err(e) = self.logout_all(req.user_id).await {
            warn!(user_id = %req.user_id, error = %e, "post-change logout_all failed");
        }

        Ok(())
    }

    /// Active device sessions for the user.
    pub async fn list_devices(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, CorvusError> {
        self.tokens.list_devices(user_id).await
    }
}
