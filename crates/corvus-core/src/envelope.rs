// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The universal request/reply envelope used on every bus RPC.
//!
//! `{ "success": bool, "data": <body>, "error": "<code>" }` -- the decode
//! site knows which `data` variant to expect from the subject it called.

use serde::{Deserialize, Serialize};

use crate::error::CorvusError;

/// Reply body wrapping either typed data or an error code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Builds a success envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Builds a failure envelope carrying the error's wire code.
    pub fn err(err: &CorvusError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.code().to_string()),
        }
    }

    /// Unwraps the envelope into a typed result.
    ///
    /// Error codes that name a known unit variant come back as that
    /// variant; anything else degrades to [`CorvusError::Internal`] with
    /// the original string preserved.
    pub fn into_result(self) -> Result<T, CorvusError> {
        if self.success {
            self.data
                .ok_or_else(|| CorvusError::Internal("success envelope without data".to_string()))
        } else {
            let code = self.error.unwrap_or_else(|| "internal_error".to_string());
            Err(CorvusError::from_code(&code).unwrap_or(CorvusError::Internal(code)))
        }
    }
}
