// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus handlers exposing the auth service on `auth.*` subjects.
//!
//! Every request/reply handler answers with the universal envelope and
//! ACKs regardless of outcome -- an application-level failure is not a
//! redelivery signal. The admin approval/rejection subscribers drive the
//! registration saga.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use corvus_bus::{handler_fn, subjects, BusClient, BusMessage};
use corvus_core::{CorvusError, UserRole};

use crate::events::{
    EventPublisher, PasswordResetEvent, RegistrationApprovedEvent, RegistrationRejectedEvent,
    RegistrationRequestedEvent, UserLoginEvent, UserLogoutEvent, UserRegisteredEvent,
};
use crate::registration::{RegisterRequest as RegistrationInput, RegistrationService};
use crate::service::{AuthService, ChangePasswordRequest as ChangePasswordInput, LoginRequest as LoginInput, RefreshRequest as RefreshInput};

/// Queue group shared by auth service instances.
const QUEUE_GROUP: &str = "auth-service";

// --- Wire DTOs ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub request_id: Uuid,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRequest {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub user_id: Uuid,
    pub token: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Wires the auth and registration services onto the bus.
pub struct AuthHandlers {
    auth: Arc<AuthService>,
    registration: Arc<RegistrationService>,
    publisher: EventPublisher,
    access_ttl_secs: u64,
}

impl AuthHandlers {
    pub fn new(
        auth: Arc<AuthService>,
        registration: Arc<RegistrationService>,
        publisher: EventPublisher,
        access_ttl_secs: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            auth,
            registration,
            publisher,
            access_ttl_secs,
        })
    }

    /// Subscribes every auth subject; returns the dispatch task handles.
    pub async fn start(
        self: Arc<Self>,
        bus: &BusClient,
    ) -> Result<Vec<JoinHandle<()>>, CorvusError> {
        let handles = vec![
            Self::queue_route(&self, bus, subjects::AUTH_REGISTER, |this, msg| async move {
                this.handle_register(msg).await
            })
            .await?,
            Self::queue_route(&self, bus, subjects::AUTH_LOGIN, |this, msg| async move {
                this.handle_login(msg).await
            })
            .await?,
            Self::queue_route(&self, bus, subjects::AUTH_REFRESH, |this, msg| async move {
                this.handle_refresh(msg).await
            })
            .await?,
            Self::queue_route(&self, bus, subjects::AUTH_VALIDATE, |this, msg| async move {
                this.handle_validate(msg).await
            })
            .await?,
            Self::queue_route(&self, bus, subjects::AUTH_LOGOUT, |this, msg| async move {
                this.handle_logout(msg).await
            })
            .await?,
            Self::queue_route(&self, bus, subjects::AUTH_LOGOUT_ALL, |this, msg| async move {
                this.handle_logout_all(msg).await
            })
            .await?,
            Self::queue_route(&self, bus, subjects::AUTH_CHANGE_PASSWORD, |this, msg| {
                async move { this.handle_change_password(msg).await }
            })
            .await?,
            // Saga events are broadcast, not load-balanced by queue group:
            // every auth instance must observe them; idempotence at the
            // repository keeps double processing harmless.
            Self::event_route(&self, bus, subjects::ADMIN_REGISTRATION_APPROVED, |this, msg| {
                async move { this.handle_registration_approved(msg).await }
            })
            .await?,
            Self::event_route(&self, bus, subjects::ADMIN_REGISTRATION_REJECTED, |this, msg| {
                async move { this.handle_registration_rejected(msg).await }
            })
            .await?,
        ];

        info!("auth bus handlers started");
        Ok(handles)
    }

    async fn queue_route<F, Fut>(
        this: &Arc<Self>,
        bus: &BusClient,
        subject: &str,
        f: F,
    ) -> Result<JoinHandle<()>, CorvusError>
    where
        F: Fn(Arc<Self>, BusMessage) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), CorvusError>> + Send + 'static,
    {
        let this = this.clone();
        bus.queue_subscribe(
            subject,
            QUEUE_GROUP,
            handler_fn(move |msg| f(this.clone(), msg)),
        )
        .await
    }

    async fn event_route<F, Fut>(
        this: &Arc<Self>,
        bus: &BusClient,
        subject: &str,
        f: F,
    ) -> Result<JoinHandle<()>, CorvusError>
    where
        F: Fn(Arc<Self>, BusMessage) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), CorvusError>> + Send + 'static,
    {
        let this = this.clone();
        bus.subscribe(subject, handler_fn(move |msg| f(this.clone(), msg)))
            .await
    }

    async fn handle_register(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: RegisterRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        let input = RegistrationInput {
            username: req.username.clone(),
            email: req.email.clone(),
            password: req.password,
            metadata: req.metadata,
        };

        match self.registration.create_request(input).await {
            Ok(request_id) => {
                let _ = self
                    .publisher
                    .registration_requested(
                        &msg.context,
                        RegistrationRequestedEvent {
                            request_id,
                            username: req.username,
                            email: req.email,
                            timestamp: Utc::now(),
                        },
                    )
                    .await;

                msg.respond_ok(RegisterResponse {
                    request_id,
                    status: "pending".to_string(),
                    message: "Registration request submitted, awaiting approval".to_string(),
                })
                .await
            }
            Err(e) => msg.respond_err(&e).await,
        }
    }

    async fn handle_login(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: LoginRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        let input = LoginInput {
            email: req.email,
            password: req.password,
            device_id: req.device_id.clone(),
            user_agent: req.user_agent.clone(),
            ip_address: req.ip_address.clone(),
        };

        match self.auth.login(input).await {
            Ok((pair, user_id)) => {
                let _ = self
                    .publisher
                    .user_login(
                        &msg.context,
                        UserLoginEvent {
                            user_id,
                            device_id: req.device_id,
                            user_agent: req.user_agent,
                            ip_address: req.ip_address,
                            timestamp: Utc::now(),
                        },
                    )
                    .await;

                msg.respond_ok(LoginResponse {
                    access_token: pair.access_token,
                    refresh_token: pair.refresh_token,
                    expires_in: self.access_ttl_secs,
                })
                .await
            }
            Err(e) => msg.respond_err(&e).await,
        }
    }

    async fn handle_refresh(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: RefreshRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        let input = RefreshInput {
            refresh_token: req.refresh_token,
            device_id: req.device_id,
            user_agent: req.user_agent,
            ip_address: req.ip_address,
        };

        match self.auth.refresh(input).await {
            Ok((pair, _user_id)) => {
                msg.respond_ok(LoginResponse {
                    access_token: pair.access_token,
                    refresh_token: pair.refresh_token,
                    expires_in: self.access_ttl_secs,
                })
                .await
            }
            // Expired tokens keep their own code; everything else about
            // the token collapses to invalid_token.
            Err(CorvusError::ExpiredToken) => msg.respond_err(&CorvusError::ExpiredToken).await,
            Err(CorvusError::UserNotActive) => {
                msg.respond_err(&CorvusError::UserNotActive).await
            }
            Err(_) => msg.respond_err(&CorvusError::InvalidToken).await,
        }
    }

    async fn handle_validate(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: ValidateRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        let response = match self.auth.validate_access(&req.token).await {
            Ok(claims) => ValidateResponse {
                valid: true,
                user_id: Some(claims.user_id),
                role: Some(claims.role),
            },
            Err(_) => ValidateResponse {
                valid: false,
                user_id: None,
                role: None,
            },
        };
        msg.respond_ok(response).await
    }

    /// Verifies the presented access token belongs to `user_id`.
    async fn authorize(&self, token: &str, user_id: Uuid) -> Result<(), CorvusError> {
        let claims = self
            .auth
            .validate_access(token)
            .await
            .map_err(|_| CorvusError::Unauthorized)?;
        if claims.user_id != user_id {
            return Err(CorvusError::Unauthorized);
        }
        Ok(())
    }

    async fn handle_logout(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: LogoutRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        // `token` is the refresh token of the session being closed; the
        // service checks it belongs to `user_id` before revoking.
        match self.auth.logout(req.user_id, &req.token).await {
            Ok(()) => {
                let _ = self
                    .publisher
                    .user_logout(
                        &msg.context,
                        UserLogoutEvent {
                            user_id: req.user_id,
                            timestamp: Utc::now(),
                        },
                    )
                    .await;
                msg.respond_ok(MessageResponse {
                    message: "Logged out successfully".to_string(),
                })
                .await
            }
            Err(e) => msg.respond_err(&e).await,
        }
    }

    async fn handle_logout_all(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: LogoutRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        if let Err(e) = self.authorize(&req.token, req.user_id).await {
            return msg.respond_err(&e).await;
        }

        match self.auth.logout_all(req.user_id).await {
            Ok(()) => {
                let _ = self
                    .publisher
                    .user_logout(
                        &msg.context,
                        UserLogoutEvent {
                            user_id: req.user_id,
                            timestamp: Utc::now(),
                        },
                    )
                    .await;
                msg.respond_ok(MessageResponse {
                    message: "Logged out from all devices".to_string(),
                })
                .await
            }
            Err(e) => msg.respond_err(&e).await,
        }
    }

    async fn handle_change_password(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let req: ChangePasswordRequest = match msg.decode() {
            Ok(req) => req,
            Err(e) => return msg.respond_err(&e).await,
        };

        if let Err(e) = self.authorize(&req.token, req.user_id).await {
            return msg.respond_err(&e).await;
        }

        let input = ChangePasswordInput {
            user_id: req.user_id,
            old_password: req.old_password,
            new_password: req.new_password,
        };

        match self.auth.change_password(input).await {
            Ok(()) => {
                let _ = self
                    .publisher
                    .password_reset(
                        &msg.context,
                        PasswordResetEvent {
                            user_id: req.user_id,
                            method: "self-service".to_string(),
                            timestamp: Utc::now(),
                        },
                    )
                    .await;
                msg.respond_ok(MessageResponse {
                    message: "Password changed successfully".to_string(),
                })
                .await
            }
            Err(e) => msg.respond_err(&e).await,
        }
    }

    async fn handle_registration_approved(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let event: RegistrationApprovedEvent = msg.decode()?;

        let user = self
            .registration
            .approve(event.request_id, event.approver_id)
            .await?;

        info!(
            request_id = %event.request_id,
            user_id = %user.id,
            "registration approved, user created"
        );

        if let Err(e) = self
            .publisher
            .user_registered(
                &msg.context,
                UserRegisteredEvent {
                    user_id: user.id,
                    username: user.username,
                    email: user.email,
                    timestamp: Utc::now(),
                },
            )
            .await
        {
            error!(error = %e, "failed to publish user registered event");
        }

        Ok(())
    }

    async fn handle_registration_rejected(&self, msg: BusMessage) -> Result<(), CorvusError> {
        let event: RegistrationRejectedEvent = msg.decode()?;

        self.registration
            .reject(event.request_id, event.approver_id)
            .await?;

        info!(
            request_id = %event.request_id,
            approver_id = %event.approver_id,
            reason = event.reason.as_deref().unwrap_or(""),
            "registration rejected"
        );
        Ok(())
    }
}
