// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Each route validates its body, mints a fresh trace context at
//! ingress, extracts client metadata, and forwards to the relevant bus
//! connector. Middleware: rate limit, request id, permissive CORS.

use std::collections::HashMap;

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use corvus_bus::RequestContext;
use corvus_core::CorvusError;

use crate::connector::{
    AuthConnector, ChangePasswordCall, DocumentConnector, ListDocumentsCall, LoginCall,
    LogoutCall, RefreshCall, RegisterCall, ValidateCall,
};
use crate::error::{error_response, validation_response};
use crate::ratelimit::RateLimiter;

/// Shared state for gateway request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub auth: AuthConnector,
    pub documents: DocumentConnector,
    pub limiter: RateLimiter,
}

/// Builds the gateway router with all middleware attached.
pub fn router(state: GatewayState) -> Router {
    let limiter = state.limiter.clone();

    Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/validate", post(validate))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/logout-all", post(logout_all))
        .route("/api/v1/auth/change-password", post(change_password))
        .route("/documents", get(list_documents).post(create_document))
        .route(
            "/documents/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
        .layer(middleware::from_fn_with_state(limiter, rate_limit_layer))
        .layer(middleware::from_fn(request_id_layer))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the gateway until the listener fails.
pub async fn serve(addr: &str, state: GatewayState) -> Result<(), CorvusError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CorvusError::bus(format!("failed to bind gateway to {addr}"), e))?;
    info!(addr, "gateway listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| CorvusError::bus("gateway server error", e))
}

async fn rate_limit_layer(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.try_acquire().await {
        return RateLimiter::rejection();
    }
    next.run(request).await
}

async fn request_id_layer(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let mut response = next.run(request).await;
    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert("X-Request-Id", value);
    }
    response
}

/// Client metadata extracted from request headers.
struct ClientMeta {
    user_agent: String,
    ip_address: String,
}

fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    // First hop of X-Forwarded-For, falling back to X-Real-Ip.
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
        })
        .unwrap_or("")
        .to_string();

    ClientMeta {
        user_agent,
        ip_address,
    }
}

// --- Auth request bodies ---

#[derive(Debug, Deserialize, Validate)]
struct RegisterBody {
    #[validate(length(min = 3, max = 64))]
    username: String,
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginBody {
    #[validate(email)]
    email: String,
    #[validate(length(min = 1))]
    password: String,
    #[serde(default)]
    device_id: String,
}

#[derive(Debug, Deserialize, Validate)]
struct RefreshBody {
    #[validate(length(min = 1))]
    refresh_token: String,
    #[serde(default)]
    device_id: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ValidateBody {
    #[validate(length(min = 1))]
    token: String,
}

#[derive(Debug, Deserialize, Validate)]
struct LogoutBody {
    user_id: Uuid,
    #[validate(length(min = 1))]
    token: String,
}

#[derive(Debug, Deserialize, Validate)]
struct ChangePasswordBody {
    user_id: Uuid,
    #[validate(length(min = 1))]
    token: String,
    #[validate(length(min = 1))]
    old_password: String,
    #[validate(length(min = 8))]
    new_password: String,
}

// --- Auth handlers ---

async fn register(
    State(state): State<GatewayState>,
    Json(body): Json<RegisterBody>,
) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();

    match state
        .auth
        .register(
            &ctx,
            &RegisterCall {
                username: body.username,
                email: body.email,
                password: body.password,
                metadata: body.metadata,
            },
        )
        .await
    {
        Ok(reply) => (StatusCode::ACCEPTED, Json(reply)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn login(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<LoginBody>,
) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();
    let meta = client_meta(&headers);

    match state
        .auth
        .login(
            &ctx,
            &LoginCall {
                email: body.email,
                password: body.password,
                device_id: body.device_id,
                user_agent: meta.user_agent,
                ip_address: meta.ip_address,
            },
        )
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn refresh(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(body): Json<RefreshBody>,
) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();
    let meta = client_meta(&headers);

    match state
        .auth
        .refresh(
            &ctx,
            &RefreshCall {
                refresh_token: body.refresh_token,
                device_id: body.device_id,
                user_agent: meta.user_agent,
                ip_address: meta.ip_address,
            },
        )
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn validate(State(state): State<GatewayState>, Json(body): Json<ValidateBody>) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();

    match state
        .auth
        .validate(&ctx, &ValidateCall { token: body.token })
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn logout(State(state): State<GatewayState>, Json(body): Json<LogoutBody>) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();

    match state
        .auth
        .logout(
            &ctx,
            &LogoutCall {
                user_id: body.user_id,
                token: body.token,
            },
        )
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn logout_all(State(state): State<GatewayState>, Json(body): Json<LogoutBody>) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();

    match state
        .auth
        .logout_all(
            &ctx,
            &LogoutCall {
                user_id: body.user_id,
                token: body.token,
            },
        )
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn change_password(
    State(state): State<GatewayState>,
    Json(body): Json<ChangePasswordBody>,
) -> Response {
    if let Err(errors) = body.validate() {
        return validation_response(&errors);
    }
    let ctx = RequestContext::new_root();

    match state
        .auth
        .change_password(
            &ctx,
            &ChangePasswordCall {
                user_id: body.user_id,
                token: body.token,
                old_password: body.old_password,
                new_password: body.new_password,
            },
        )
        .await
    {
        Ok(reply) => Json(reply).into_response(),
        Err(e) => error_response(&e),
    }
}

// --- Document handlers ---

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<u32>,
    offset: Option<u32>,
}

async fn list_documents(
    State(state): State<GatewayState>,
    Query(params): Query<ListParams>,
) -> Response {
    let ctx = RequestContext::new_root();
    let call = ListDocumentsCall {
        limit: params.limit,
        offset: params.offset,
    };
    match state.documents.list(&ctx, &call).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn get_document(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    let ctx = RequestContext::new_root();
    match state.documents.get(&ctx, &id).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn create_document(
    State(state): State<GatewayState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let ctx = RequestContext::new_root();
    match state.documents.create(&ctx, &body).await {
        Ok(data) => (StatusCode::CREATED, Json(data)).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn update_document(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let ctx = RequestContext::new_root();
    match state.documents.update(&ctx, &id, &body).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => error_response(&e),
    }
}

async fn delete_document(State(state): State<GatewayState>, Path(id): Path<String>) -> Response {
    let ctx = RequestContext::new_root();
    match state.documents.delete(&ctx, &id).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_body_validation() {
        let ok: LoginBody = serde_json::from_str(
            r#"{"email": "a@example.com", "password": "pw", "device_id": "d1"}"#,
        )
        .unwrap();
        assert!(ok.validate().is_ok());

        let bad: LoginBody =
            serde_json::from_str(r#"{"email": "nope", "password": ""}"#).unwrap();
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[test]
    fn register_body_enforces_password_length() {
        let bad: RegisterBody = serde_json::from_str(
            r#"{"username": "bob", "email": "bob@example.com", "password": "short"}"#,
        )
        .unwrap();
        let errors = bad.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn logout_body_requires_uuid_user_id() {
        let result: Result<LogoutBody, _> =
            serde_json::from_str(r#"{"user_id": "not-a-uuid", "token": "t"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn client_meta_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "test-agent".parse().unwrap());
        headers.insert("x-forwarded-for", "9.8.7.6, 10.0.0.1".parse().unwrap());
        headers.insert("x-real-ip", "1.1.1.1".parse().unwrap());

        let meta = client_meta(&headers);
        assert_eq!(meta.user_agent, "test-agent");
        assert_eq!(meta.ip_address, "9.8.7.6");
    }

    #[test]
    fn client_meta_falls_back_to_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "2.2.2.2".parse().unwrap());
        let meta = client_meta(&headers);
        assert_eq!(meta.ip_address, "2.2.2.2");
        assert!(meta.user_agent.is_empty());
    }

    #[test]
    fn client_meta_defaults_to_empty() {
        let meta = client_meta(&HeaderMap::new());
        assert!(meta.ip_address.is_empty());
        assert!(meta.user_agent.is_empty());
    }
}
