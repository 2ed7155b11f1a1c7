// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus-error to HTTP-status mapping and the error response body.

use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use validator::ValidationErrors;

use corvus_core::CorvusError;

/// User-visible error body: category code, human message, and optional
/// per-field validation tags.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

/// Maps a platform error onto an HTTP status.
pub fn status_for(err: &CorvusError) -> StatusCode {
    match err {
        CorvusError::InvalidCredentials
        | CorvusError::InvalidToken
        | CorvusError::ExpiredToken
        | CorvusError::Unauthorized
        | CorvusError::UserNotActive => StatusCode::UNAUTHORIZED,

        CorvusError::UserNotFound
        | CorvusError::TokenNotFound
        | CorvusError::RegistrationNotFound => StatusCode::NOT_FOUND,

        CorvusError::UsernameExists
        | CorvusError::EmailExists
        | CorvusError::InvalidEmail
        | CorvusError::InvalidPassword
        | CorvusError::Serialization(_) => StatusCode::BAD_REQUEST,

        CorvusError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        CorvusError::NoResponders { .. } => StatusCode::BAD_GATEWAY,

        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Renders a platform error as its JSON response.
pub fn error_response(err: &CorvusError) -> Response {
    let status = status_for(err);
    (
        status,
        Json(ErrorBody {
            error: err.code().to_string(),
            message: err.to_string(),
            details: None,
        }),
    )
        .into_response()
}

/// Renders validation failures as a 400 with per-field tag names.
pub fn validation_response(errors: &ValidationErrors) -> Response {
    let details: HashMap<String, String> = errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let tag = errs
                .first()
                .map(|e| e.code.to_string())
                .unwrap_or_else(|| "invalid".to_string());
            (field.to_string(), tag)
        })
        .collect();

    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: "validation_failed".to_string(),
            message: "request validation failed".to_string(),
            details: Some(details),
        }),
    )
        .into_response()
}
