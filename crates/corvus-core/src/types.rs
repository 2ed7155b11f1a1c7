// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Corvus services.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role assigned to a platform user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Parses a role string, defaulting to `User` for unknown values.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "admin" => UserRole::Admin,
            _ => UserRole::User,
        }
    }
}

/// A platform user.
///
/// The password hash never leaves the auth service; serializers in other
/// crates work with projections of this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique login name.
    pub username: String,
    /// Unique, lower-cased email address.
    pub email: String,
    /// Adaptive password hash (never plaintext).
    pub password_hash: String,
    pub role: UserRole,
    /// Only active users may authenticate.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A refresh token record, one per (user, device) session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    /// Globally-unique opaque token value.
    pub token: String,
    pub user_id: Uuid,
    pub device_id: String,
    pub user_agent: String,
    pub ip_address: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of a registration request.
///
/// Transitions only from `Pending` to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    Pending,
    Approved,
    Rejected,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    pub fn from_str_value(s: &str) -> Self {
        match s {
            "approved" => RegistrationStatus::Approved,
            "rejected" => RegistrationStatus::Rejected,
            _ => RegistrationStatus::Pending,
        }
    }
}

/// A pending-membership request awaiting admin approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    /// Already hashed at submission time, never plaintext.
    pub password_hash: String,
    pub status: RegistrationStatus,
    /// Arbitrary caller-supplied metadata.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
}

/// A document submitted for indexing.
///
/// Content arrives either inline (`content`, legacy API) or by reference
/// to the object store (`file_path`) -- never both.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub source_uri: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A windowed slice of a document's text, the unit of embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub document_id: String,
    /// Dense ordinal starting at 0, monotonic within a document.
    pub ordinal: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user", "assistant", or "system".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// One chunk of a streaming generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationChunk {
    pub done: bool,
    pub message: ChatMessage,
    pub created_at: DateTime<Utc>,
}

/// A record written to the vector database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, serde_json::Value>,
}

/// A nearest-neighbor query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub payload: HashMap<String, serde_json::Value>,
}

/// Lower-cases and trims an email for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_serde() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let back: UserRole = serde_json::from_str(&json).unwrap();
        assert_eq!(back, UserRole::Admin);
    }

    #[test]
    fn unknown_role_defaults_to_user() {
        assert_eq!(UserRole::from_str_value("superuser"), UserRole::User);
    }

    #[test]
    fn registration_status_transitions_are_nameable() {
        assert_eq!(RegistrationStatus::Pending.as_str(), "pending");
        assert_eq!(
            RegistrationStatus::from_str_value("approved"),
            RegistrationStatus::Approved
        );
        assert_eq!(
            RegistrationStatus::from_str_value("garbage"),
            RegistrationStatus::Pending
        );
    }

    #[test]
    fn document_deserializes_with_minimal_fields() {
        let json = r#"{"id": "doc-1"}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.id, "doc-1");
        assert!(doc.content.is_empty());
        assert!(doc.file_path.is_empty());
        assert!(doc.metadata.is_empty());
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn chat_message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }
}
