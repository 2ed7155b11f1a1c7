// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration saga: pending-request lifecycle and user materialization.
//!
//! Submission validates identity shape and uniqueness across both the
//! user table and pending requests, then stores the request with the
//! password already hashed. Approval is pending-only and creates the
//! user before flipping the request, so a flip failure leaves a user the
//! admin can reconcile rather than a lost approval.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use uuid::Uuid;

use corvus_core::{
    normalize_email, CorvusError, RegistrationRepository, RegistrationRequest, RegistrationStatus,
    User, UserRepository, UserRole,
};

use crate::password::hash_password;

const MIN_PASSWORD_LEN: usize = 8;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
            .expect("email regex is valid")
    })
}

/// Submission inputs for a new registration request.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Registration business logic over the two repositories.
pub struct RegistrationService {
    requests: Arc<dyn RegistrationRepository>,
    users: Arc<dyn UserRepository>,
}

impl RegistrationService {
    pub fn new(
        requests: Arc<dyn RegistrationRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self { requests, users }
    }

    /// Validates and stores a pending registration request.
    pub async fn create_request(&self, req: RegisterRequest) -> Result<Uuid, CorvusError> {
        let email = normalize_email(&req.email);

        if !email_regex().is_match(&email) {
            return Err(CorvusError::InvalidEmail);
        }
        if req.password.len() < MIN_PASSWORD_LEN {
            return Err(CorvusError::InvalidPassword);
        }

        if self.users.exists_by_email(&email).await? {
            return Err(CorvusError::EmailExists);
        }
        if self.users.exists_by_username(&req.username).await? {
            return Err(CorvusError::UsernameExists);
        }
        if self.requests.exists_pending_by_email(&email).await? {
            return Err(CorvusError::EmailExists);
        }
        if self
            .requests
            .exists_pending_by_username(&req.username)
            .await?
        {
            return Err(CorvusError::UsernameExists);
        }

        let request = RegistrationRequest {
            id: Uuid::new_v4(),
            username: req.username,
            email,
            password_hash: hash_password(&req.password)?,
            status: RegistrationStatus::Pending,
            metadata: req.metadata,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            approved_by: None,
            approved_at: None,
        };
        self.requests.create(&request).await?;

        Ok(request.id)
    }

    /// Approves a pending request and materializes the user.
    ///
    /// A request that has already left the pending state fails fast with
    /// `registration_not_pending` -- a double-delivered approval never
    /// creates a second user.
    pub async fn approve(&self, request_id: Uuid, approver_id: Uuid) -> Result<User, CorvusError> {
        let request = self.requests.get_by_id(request_id).await?;

        if request.status != RegistrationStatus::Pending {
            return Err(CorvusError::RegistrationNotPending);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: request.username,
            email: request.email,
            // The stored value is already a hash.
            password_hash: request.password_hash,
            role: UserRole::User,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.users.create(&user).await?;

        self.requests
            .update_status(request_id, RegistrationStatus::Approved, Some(approver_id))
            .await?;

        Ok(user)
    }

    /// Rejects a pending request.
    pub async fn reject(&self, request_id: Uuid, approver_id: Uuid) -> Result<(), CorvusError> {
        let request = self.requests.get_by_id(request_id).await?;

        if request.status != RegistrationStatus::Pending {
            return Err(CorvusError::RegistrationNotPending);
        }

        self.requests
            .update_status(request_id, RegistrationStatus::Rejected, Some(approver_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::password::verify_password;
    use crate::repository::SqliteRepository;

    async fn service() -> (RegistrationService, Arc<SqliteRepository>) {
        let repo = Arc::new(SqliteRepository::open_in_memory().await.unwrap());
        (
            RegistrationService::new(repo.clone(), repo.clone()),
            repo,
        )
    }

    fn register_req(username: &str, email: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn create_request_stores_pending_with_hashed_password() {
        let (service, repo) = service().await;
        let id = service
            .create_request(register_req("bob", "bob@example.com"))
            .await
            .unwrap();

        let request = RegistrationRepository::get_by_id(repo.as_ref(), id)
            .await
            .unwrap();
        assert_eq!(request.status, RegistrationStatus::Pending);
        assert_ne!(request.password_hash, "password123");
        assert!(verify_password("password123", &request.password_hash));
    }

    #[tokio::test]
    async fn email_is_normalized_before_validation() {
        let (service, repo) = service().await;
        let id = service
            .create_request(register_req("bob", "  Bob@Example.COM "))
            .await
            .unwrap();
        let request = RegistrationRepository::get_by_id(repo.as_ref(), id)
            .await
            .unwrap();
        assert_eq!(request.email, "bob@example.com");
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let (service, _) = service().await;
        for bad in ["not-an-email", "a@b", "@example.com", "user@.com", ""] {
            let err = service
                .create_request(register_req("bob", bad))
                .await
                .unwrap_err();
            assert!(matches!(err, CorvusError::InvalidEmail), "input: {bad}");
        }
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (service, _) = service().await;
        let mut req = register_req("bob", "bob@example.com");
        req.password = "seven77".to_string();
        let err = service.create_request(req).await.unwrap_err();
        assert!(matches!(err, CorvusError::InvalidPassword));
    }

    #[tokio::test]
    async fn duplicate_pending_request_is_rejected() {
        let (service, _) = service().await;
        service
            .create_request(register_req("bob", "bob@example.com"))
            .await
            .unwrap();

        let err = service
            .create_request(register_req("bobby", "bob@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorvusError::EmailExists));

        let err = service
            .create_request(register_req("bob", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorvusError::UsernameExists));
    }

    #[tokio::test]
    async fn existing_user_blocks_registration() {
        let (service, repo) = service().await;
        let user = User {
            id: Uuid::new_v4(),
            username: "taken".to_string(),
            email: "taken@example.com".to_string(),
            password_hash: "hash".to_string(),
            role: UserRole::User,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        UserRepository::create(repo.as_ref(), &user).await.unwrap();

        let err = service
            .create_request(register_req("taken", "new@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorvusError::UsernameExists));

        let err = service
            .create_request(register_req("newname", "taken@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorvusError::EmailExists));
    }

    #[tokio::test]
    async fn approve_materializes_active_user() {
        let (service, repo) = service().await;
        let id = service
            .create_request(register_req("bob", "bob@example.com"))
            .await
            .unwrap();

        let approver = Uuid::new_v4();
        let user = service.approve(id, approver).await.unwrap();

        assert_eq!(user.username, "bob");
        assert_eq!(user.email, "bob@example.com");
        assert_eq!(user.role, UserRole::User);
        assert!(user.is_active);
        // Password hash is carried over, not re-hashed.
        assert!(verify_password("password123", &user.password_hash));

        let request = RegistrationRepository::get_by_id(repo.as_ref(), id)
            .await
            .unwrap();
        assert_eq!(request.status, RegistrationStatus::Approved);
        assert_eq!(request.approved_by, Some(approver));
    }

    #[tokio::test]
    async fn double_approval_creates_exactly_one_user() {
        let (service, repo) = service().await;
        let id = service
            .create_request(register_req("bob", "bob@example.com"))
            .await
            .unwrap();

        let approver = Uuid::new_v4();
        service.approve(id, approver).await.unwrap();

        let err = service.approve(id, approver).await.unwrap_err();
        assert!(matches!(err, CorvusError::RegistrationNotPending));

        // Exactly one user exists for the identity.
        assert!(repo.exists_by_username("bob").await.unwrap());
        let user = repo.get_by_email("bob@example.com").await.unwrap();
        assert_eq!(user.username, "bob");
    }

    #[tokio::test]
    async fn reject_is_terminal() {
        let (service, repo) = service().await;
        let id = service
            .create_request(register_req("bob", "bob@example.com"))
            .await
            .unwrap();

        service.reject(id, Uuid::new_v4()).await.unwrap();

        let request = RegistrationRepository::get_by_id(repo.as_ref(), id)
            .await
            .unwrap();
        assert_eq!(request.status, RegistrationStatus::Rejected);

        // Neither approve nor a second reject can follow.
        assert!(matches!(
            service.approve(id, Uuid::new_v4()).await.unwrap_err(),
            CorvusError::RegistrationNotPending
        ));
        assert!(matches!(
            service.reject(id, Uuid::new_v4()).await.unwrap_err(),
            CorvusError::RegistrationNotPending
        ));

        // No user was materialized.
        assert!(!repo.exists_by_username("bob").await.unwrap());
    }

    #[tokio::test]
    async fn approve_missing_request_is_not_found() {
        let (service, _) = service().await;
        let err = service
            .approve(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CorvusError::RegistrationNotFound));
    }
}
