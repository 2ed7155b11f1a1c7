// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auth event payloads and their publisher.
//!
//! Events are fire-and-forget; publish failures are the caller's choice
//! to propagate or log. The publisher injects the current trace context
//! through the bus client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use corvus_bus::{subjects, BusClient, RequestContext};
use corvus_core::CorvusError;

/// Published on `auth.registration.requested`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequestedEvent {
    pub request_id: Uuid,
    pub username: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

/// Published on `auth.user.registered` after approval materializes a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredEvent {
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
}

/// Published on `auth.user.login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoginEvent {
    pub user_id: Uuid,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

/// Published on `auth.user.logout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLogoutEvent {
    pub user_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Published on `auth.password.reset`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetEvent {
    pub user_id: Uuid,
    pub method: String,
    pub timestamp: DateTime<Utc>,
}

/// Received from `admin.registration.approved`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationApprovedEvent {
    pub request_id: Uuid,
    pub approver_id: Uuid,
}

/// Received from `admin.registration.rejected`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRejectedEvent {
    pub request_id: Uuid,
    pub approver_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Publishes auth events on their subjects with trace propagation.
#[derive(Clone)]
pub struct EventPublisher {
    bus: BusClient,
}

impl EventPublisher {
    pub fn new(bus: BusClient) -> Self {
        Self { bus }
    }

    pub async fn registration_requested(
        &self,
        ctx: &RequestContext,
        event: RegistrationRequestedEvent,
    ) -> Result<(), CorvusError> {
        self.bus
            .publish_json(ctx, subjects::AUTH_REGISTRATION_REQUESTED, &event)
            .await
    }

    pub async fn user_registered(
        &self,
        ctx: &RequestContext,
        event: UserRegisteredEvent,
    ) -> Result<(), CorvusError> {
        self.bus
            .publish_json(ctx, subjects::AUTH_USER_REGISTERED, &event)
            .await
    }

    pub async fn user_login(
        &self,
        ctx: &RequestContext,
        event: UserLoginEvent,
    ) -> Result<(), CorvusError> {
        self.bus
            .publish_json(ctx, subjects::AUTH_USER_LOGIN, &event)
            .await
    }

    pub async fn user_logout(
        &self,
        ctx: &RequestContext,
        event: UserLogoutEvent,
    ) -> Result<(), CorvusError> {
        self.bus
            .publish_json(ctx, subjects::AUTH_USER_LOGOUT, &event)
            .await
    }

    pub async fn password_reset(
        &self,
        ctx: &RequestContext,
        event: PasswordResetEvent,
    ) -> Result<(), CorvusError> {
        self.bus
            .publish_json(ctx, subjects::AUTH_PASSWORD_RESET, &event)
            .await
    }
}
