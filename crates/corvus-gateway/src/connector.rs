// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus connectors for the services behind the gateway.
//!
//! Each call serializes the request, performs a bus request with the
//! default timeout and trace propagation, and decodes the universal
//! envelope into a typed result.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use corvus_bus::{subjects, BusClient, RequestContext};
use corvus_core::{CorvusError, UserRole};

// --- Auth wire shapes (mirrors the auth service DTOs) ---

#[derive(Debug, Clone, Serialize)]
pub struct LoginCall {
    pub email: String,
    pub password: String,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenPairReply {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshCall {
    pub refresh_token: String,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterCall {
    pub username: String,
    pub email: String,
    pub password: String,
    pub metadata: std::collections::HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegisterReply {
    pub request_id: Uuid,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateCall {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidateReply {
    pub valid: bool,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogoutCall {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangePasswordCall {
    pub user_id: Uuid,
    pub token: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MessageReply {
    pub message: String,
}

/// RPC client for the auth service subjects.
#[derive(Clone)]
pub struct AuthConnector {
    bus: BusClient,
}

impl AuthConnector {
    pub fn new(bus: BusClient) -> Self {
        Self { bus }
    }

    pub async fn register(
        &self,
        ctx: &RequestContext,
        call: &RegisterCall,
    ) -> Result<RegisterReply, CorvusError> {
        self.bus
            .request_json(ctx, subjects::AUTH_REGISTER, call)
            .await
    }

    pub async fn login(
        &self,
        ctx: &RequestContext,
        call: &LoginCall,
    ) -> Result<TokenPairReply, CorvusError> {
        self.bus.request_json(ctx, subjects::AUTH_LOGIN, call).await
    }

    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        call: &RefreshCall,
    ) -> Result<TokenPairReply, CorvusError> {
        self.bus
            .request_json(ctx, subjects::AUTH_REFRESH, call)
            .await
    }

    pub async fn validate(
        &self,
        ctx: &RequestContext,
        call: &ValidateCall,
    ) -> Result<ValidateReply, CorvusError> {
        self.bus
            .request_json(ctx, subjects::AUTH_VALIDATE, call)
            .await
    }

    pub async fn logout(
        &self,
        ctx: &RequestContext,
        call: &LogoutCall,
    ) -> Result<MessageReply, CorvusError> {
        self.bus.request_json(ctx, subjects::AUTH_LOGOUT, call).await
    }

    pub async fn logout_all(
        &self,
        ctx: &RequestContext,
        call: &LogoutCall,
    ) -> Result<MessageReply, CorvusError> {
        self.bus
            .request_json(ctx, subjects::AUTH_LOGOUT_ALL, call)
            .await
    }

    pub async fn change_password(
        &self,
        ctx: &RequestContext,
        call: &ChangePasswordCall,
    ) -> Result<MessageReply, CorvusError> {
        self.bus
            .request_json(ctx, subjects::AUTH_CHANGE_PASSWORD, call)
            .await
    }
}

// --- Documents ---

/// Query parameters for the document list RPC.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListDocumentsCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct DocumentIdCall<'a> {
    id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct UpdateDocumentCall<'a> {
    id: &'a str,
    updates: &'a serde_json::Value,
}

/// RPC client for the document service subjects.
///
/// Document bodies are service-defined; the gateway relays them as
/// opaque JSON and lets the document service own the schema.
#[derive(Clone)]
pub struct DocumentConnector {
    bus: BusClient,
}

impl DocumentConnector {
    pub fn new(bus: BusClient) -> Self {
        Self { bus }
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        call: &ListDocumentsCall,
    ) -> Result<serde_json::Value, CorvusError> {
        self.bus
            .request_json(ctx, subjects::DOCUMENTS_LIST, call)
            .await
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<serde_json::Value, CorvusError> {
        self.bus
            .request_json(ctx, subjects::DOCUMENTS_GET, &DocumentIdCall { id })
            .await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, CorvusError> {
        self.bus
            .request_json(ctx, subjects::DOCUMENTS_CREATE, body)
            .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        updates: &serde_json::Value,
    ) -> Result<serde_json::Value, CorvusError> {
        self.bus
            .request_json(
                ctx,
                subjects::DOCUMENTS_UPDATE,
                &UpdateDocumentCall { id, updates },
            )
            .await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        id: &str,
    ) -> Result<serde_json::Value, CorvusError> {
        self.bus
            .request_json(ctx, subjects::DOCUMENTS_DELETE, &DocumentIdCall { id })
            .await
    }
}
