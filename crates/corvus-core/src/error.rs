// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Corvus platform.
//!
//! Every error carries a stable `code()` string that travels inside reply
//! envelopes on the bus; the gateway maps codes back onto HTTP statuses.

use thiserror::Error;

/// The primary error type used across all Corvus crates.
#[derive(Debug, Error)]
pub enum CorvusError {
    // --- Identity / credential ---
    /// Email lookup or password verification failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No user with the given identifier.
    #[error("user not found")]
    UserNotFound,

    /// The user exists but has been deactivated.
    #[error("user is not active")]
    UserNotActive,

    /// The caller is not allowed to perform the operation.
    #[error("unauthorized")]
    Unauthorized,

    // --- Token ---
    /// Signature, shape, or claim verification failed.
    #[error("invalid token")]
    InvalidToken,

    /// The token was valid once but its expiry has passed.
    #[error("token has expired")]
    ExpiredToken,

    /// No record for the given token value.
    #[error("token not found")]
    TokenNotFound,

    // --- Registration ---
    #[error("username already exists")]
    UsernameExists,

    #[error("email already exists")]
    EmailExists,

    #[error("invalid email format")]
    InvalidEmail,

    #[error("password does not meet requirements")]
    InvalidPassword,

    #[error("registration request not found")]
    RegistrationNotFound,

    /// The request has already been approved or rejected.
    #[error("registration request is not pending")]
    RegistrationNotPending,

    // --- Pipeline ---
    /// Document resolved to an empty string after trimming.
    #[error("document content is empty")]
    EmptyDocument,

    /// The chunker produced nothing for a non-empty document.
    #[error("no chunks generated")]
    NoChunksGenerated,

    /// Object store or key-value backend failure.
    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Embedding model failure.
    #[error("embedding error: {message}")]
    Embed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vector database write failure.
    #[error("upsert error: {message}")]
    Upsert {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // --- Transport ---
    /// Operation exceeded its deadline.
    #[error("timeout exceeded after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Nobody is listening on the requested subject.
    #[error("no responders on subject {subject}")]
    NoResponders { subject: String },

    /// The request context was cancelled before the operation finished.
    #[error("context cancelled")]
    Cancelled,

    /// JSON encode/decode failure on a wire payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Bus connection or protocol failure.
    #[error("bus error: {message}")]
    Bus {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // --- Programming ---
    /// A handler panicked; the recover middleware promoted it to an error.
    #[error("panic recovered: {0}")]
    PanicRecovered(String),

    // --- Ambient ---
    /// Configuration errors (invalid TOML, missing required fields).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CorvusError {
    /// Stable wire code for this error, carried in reply envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_credentials",
            Self::UserNotFound => "user_not_found",
            Self::UserNotActive => "user_not_active",
            Self::Unauthorized => "unauthorized",
            Self::InvalidToken => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::TokenNotFound => "token_not_found",
            Self::UsernameExists => "username_exists",
            Self::EmailExists => "email_exists",
            Self::InvalidEmail => "invalid_email",
            Self::InvalidPassword => "invalid_password",
            Self::RegistrationNotFound => "registration_not_found",
            Self::RegistrationNotPending => "registration_not_pending",
            Self::EmptyDocument => "empty_document",
            Self::NoChunksGenerated => "no_chunks_generated",
            Self::Storage { .. } => "storage_error",
            Self::Embed { .. } => "embed_error",
            Self::Upsert { .. } => "upsert_error",
            Self::Timeout { .. } => "timeout_exceeded",
            Self::NoResponders { .. } => "no_responders",
            Self::Cancelled => "cancelled",
            Self::Serialization(_) => "serialization_error",
            Self::Bus { .. } => "bus_error",
            Self::PanicRecovered(_) => "panic_recovered",
            Self::Config(_) => "config_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Reconstructs a unit-variant error from its wire code.
    ///
    /// Codes of variants that carry payloads (storage, bus, ...) cannot be
    /// reconstructed losslessly and return `None`; callers fall back to
    /// [`CorvusError::Internal`] with the original message.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "invalid_credentials" => Some(Self::InvalidCredentials),
            "user_not_found" => Some(Self::UserNotFound),
            "user_not_active" => Some(Self::UserNotActive),
            "unauthorized" => Some(Self::Unauthorized),
            "invalid_token" => Some(Self::InvalidToken),
            "expired_token" => Some(Self::ExpiredToken),
            "token_not_found" => Some(Self::TokenNotFound),
            "username_exists" => Some(Self::UsernameExists),
            "email_exists" => Some(Self::EmailExists),
            "invalid_email" => Some(Self::InvalidEmail),
            "invalid_password" => Some(Self::InvalidPassword),
            "registration_not_found" => Some(Self::RegistrationNotFound),
            "registration_not_pending" => Some(Self::RegistrationNotPending),
            "empty_document" => Some(Self::EmptyDocument),
            "no_chunks_generated" => Some(Self::NoChunksGenerated),
            _ => None,
        }
    }

    /// Convenience constructor for storage errors wrapping a source.
    pub fn storage<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Convenience constructor for bus errors wrapping a source.
    pub fn bus<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Bus {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_for_unit_variants() {
        let variants = [
            CorvusError::InvalidCredentials,
            CorvusError::UserNotFound,
            CorvusError::UserNotActive,
            CorvusError::Unauthorized,
            CorvusError::InvalidToken,
            CorvusError::ExpiredToken,
            CorvusError::TokenNotFound,
            CorvusError::UsernameExists,
            CorvusError::EmailExists,
            CorvusError::InvalidEmail,
            CorvusError::InvalidPassword,
            CorvusError::RegistrationNotFound,
            CorvusError::RegistrationNotPending,
            CorvusError::EmptyDocument,
            CorvusError::NoChunksGenerated,
        ];
        for v in variants {
            let code = v.code();
            let back = CorvusError::from_code(code).expect("unit variant should round-trip");
            assert_eq!(back.code(), code);
        }
    }

    #[test]
    fn payload_variants_have_no_from_code() {
        assert!(CorvusError::from_code("storage_error").is_none());
        assert!(CorvusError::from_code("bus_error").is_none());
        assert!(CorvusError::from_code("does_not_exist").is_none());
    }

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            CorvusError::InvalidCredentials.to_string(),
            "invalid credentials"
        );
        assert_eq!(
            CorvusError::RegistrationNotPending.to_string(),
            "registration request is not pending"
        );
        let t = CorvusError::Timeout {
            duration: std::time::Duration::from_secs(5),
        };
        assert!(t.to_string().contains("5s"));
    }
}
