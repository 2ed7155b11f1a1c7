// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thin repository interfaces consumed by the auth service.
//!
//! Repositories return domain errors verbatim (`user_not_found`,
//! `registration_not_found`, ...); services add context but preserve the
//! underlying kind.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CorvusError;
use crate::types::{RegistrationRequest, RegistrationStatus, User};

/// Data access for platform users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), CorvusError>;

    async fn get_by_id(&self, id: Uuid) -> Result<User, CorvusError>;

    async fn get_by_email(&self, email: &str) -> Result<User, CorvusError>;

    async fn exists_by_email(&self, email: &str) -> Result<bool, CorvusError>;

    async fn exists_by_username(&self, username: &str) -> Result<bool, CorvusError>;

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), CorvusError>;
}

/// Data access for registration requests.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn create(&self, request: &RegistrationRequest) -> Result<(), CorvusError>;

    async fn get_by_id(&self, id: Uuid) -> Result<RegistrationRequest, CorvusError>;

    /// Flips a pending request into a terminal state.
    ///
    /// Returns `registration_not_pending` when the request has already
    /// left the pending state, so double-delivered approvals fail fast.
    async fn update_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
        approved_by: Option<Uuid>,
    ) -> Result<(), CorvusError>;

    async fn exists_pending_by_email(&self, email: &str) -> Result<bool, CorvusError>;

    async fn exists_pending_by_username(&self, username: &str) -> Result<bool, CorvusError>;
}
