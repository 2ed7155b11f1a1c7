// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed repositories for users and registration requests.
//!
//! Schema is applied idempotently at startup. Pending-request uniqueness
//! is enforced with partial unique indexes, and the pending->terminal
//! transition is a conditional UPDATE so double approvals lose the race
//! at the database, not just in service code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use corvus_core::{
    CorvusError, RegistrationRepository, RegistrationRequest, RegistrationStatus, User,
    UserRepository, UserRole,
};

/// Helper to convert tokio_rusqlite errors into CorvusError::Storage.
fn storage_err(e: tokio_rusqlite::Error) -> CorvusError {
    CorvusError::Storage {
        message: "database operation failed".to_string(),
        source: Some(Box::new(e)),
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS registration_requests (
    id TEXT PRIMARY KEY NOT NULL,
    username TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    approved_by TEXT,
    approved_at TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_pending_username
    ON registration_requests(username) WHERE status = 'pending';
CREATE UNIQUE INDEX IF NOT EXISTS idx_requests_pending_email
    ON registration_requests(email) WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS idx_requests_status ON registration_requests(status);
";

/// SQLite repository implementing both auth data-access traits.
pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Opens the database at `path` and applies the schema.
    pub async fn open(path: &str) -> Result<Self, CorvusError> {
        let conn = Connection::open(path).await.map_err(storage_err)?;
        let repo = Self { conn };
        repo.initialize().await?;
        Ok(repo)
    }

    /// In-memory database for tests and ephemeral deployments.
    pub async fn open_in_memory() -> Result<Self, CorvusError> {
        let conn = Connection::open_in_memory().await.map_err(storage_err)?;
        let repo = Self { conn };
        repo.initialize().await?;
        Ok(repo)
    }

    async fn initialize(&self) -> Result<(), CorvusError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(SCHEMA)?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }
}

fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let role: String = row.get(4)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(User {
        id: parse_uuid(&id)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role: UserRole::from_str_value(&role),
        is_active: row.get::<_, i64>(5)? != 0,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_request(row: &rusqlite::Row) -> rusqlite::Result<RegistrationRequest> {
    let id: String = row.get(0)?;
    let status: String = row.get(4)?;
    let metadata: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    let approved_by: Option<String> = row.get(8)?;
    let approved_at: Option<String> = row.get(9)?;

    Ok(RegistrationRequest {
        id: parse_uuid(&id)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        status: RegistrationStatus::from_str_value(&status),
        metadata: metadata
            .and_then(|m| serde_json::from_str(&m).ok())
            .unwrap_or_default(),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        approved_by: approved_by.as_deref().map(parse_uuid).transpose()?,
        approved_at: approved_at.as_deref().map(parse_ts).transpose()?,
    })
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, is_active, created_at, updated_at";

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn create(&self, user: &User) -> Result<(), CorvusError> {
        let user = user.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, username, email, password_hash, role, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    rusqlite::params![
                        user.id.to_string(),
                        user.username,
                        user.email,
                        user.password_hash,
                        user.role.as_str(),
                        user.is_active as i64,
                        user.created_at.to_rfc3339(),
                        user.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, CorvusError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))?;
                let mut rows = stmt.query_map(rusqlite::params![id], row_to_user)?;
                Ok(rows.next().transpose()?)
            })
            .await
            .map_err(storage_err)?
            .ok_or(CorvusError::UserNotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, CorvusError> {
        let email = email.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn
                    .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"))?;
                let mut rows = stmt.query_map(rusqlite::params![email], row_to_user)?;
                Ok(rows.next().transpose()?)
            })
            .await
            .map_err(storage_err)?
            .ok_or(CorvusError::UserNotFound)
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, CorvusError> {
        let email = email.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE email = ?1",
                    rusqlite::params![email],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(storage_err)
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, CorvusError> {
        let username = username.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM users WHERE username = ?1",
                    rusqlite::params![username],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(storage_err)
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), CorvusError> {
        let id = id.to_string();
        let password_hash = password_hash.to_string();
        let updated = self
            .conn
            .call(move |conn| {
                let updated = conn.execute(
                    "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
                    rusqlite::params![password_hash, Utc::now().to_rfc3339(), id],
                )?;
                Ok(updated)
            })
            .await
            .map_err(storage_err)?;

        if updated == 0 {
            return Err(CorvusError::UserNotFound);
        }
        Ok(())
    }
}

const REQUEST_COLUMNS: &str = "id, username, email, password_hash, status, metadata, \
                               created_at, updated_at, approved_by, approved_at";

#[async_trait]
impl RegistrationRepository for SqliteRepository {
    async fn create(&self, request: &RegistrationRequest) -> Result<(), CorvusError> {
        let request = request.clone();
        let metadata = serde_json::to_string(&request.metadata)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO registration_requests
                     (id, username, email, password_hash, status, metadata, created_at, updated_at, approved_by, approved_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        request.id.to_string(),
                        request.username,
                        request.email,
                        request.password_hash,
                        request.status.as_str(),
                        metadata,
                        request.created_at.to_rfc3339(),
                        request.updated_at.to_rfc3339(),
                        request.approved_by.map(|u| u.to_string()),
                        request.approved_at.map(|t| t.to_rfc3339()),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<RegistrationRequest, CorvusError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM registration_requests WHERE id = ?1"
                ))?;
                let mut rows = stmt.query_map(rusqlite::params![id], row_to_request)?;
                Ok(rows.next().transpose()?)
            })
            .await
            .map_err(storage_err)?
            .ok_or(CorvusError::RegistrationNotFound)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: RegistrationStatus,
        approved_by: Option<Uuid>,
    ) -> Result<(), CorvusError> {
        let id_str = id.to_string();
        let now = Utc::now().to_rfc3339();
        let status_str = status.as_str().to_string();
        let approver = approved_by.map(|u| u.to_string());

        let updated = self
            .conn
            .call(move |conn| {
                // Conditional on pending so a concurrent or repeated
                // approval affects zero rows.
                let updated = conn.execute(
                    "UPDATE registration_requests
                     SET status = ?1, approved_by = ?2, approved_at = ?3, updated_at = ?3
                     WHERE id = ?4 AND status = 'pending'",
                    rusqlite::params![status_str, approver, now, id_str],
                )?;
                Ok(updated)
            })
            .await
            .map_err(storage_err)?;

        if updated == 0 {
            // Distinguish missing from already-terminal.
            return match RegistrationRepository::get_by_id(self, id).await {
                Ok(_) => Err(CorvusError::RegistrationNotPending),
                Err(e) => Err(e),
            };
        }
        Ok(())
    }

    async fn exists_pending_by_email(&self, email: &str) -> Result<bool, CorvusError> {
        let email = email.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM registration_requests WHERE email = ?1 AND status = 'pending'",
                    rusqlite::params![email],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(storage_err)
    }

    async fn exists_pending_by_username(&self, username: &str) -> Result<bool, CorvusError> {
        let username = username.to_string();
        self.conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM registration_requests WHERE username = ?1 AND status = 'pending'",
                    rusqlite::params![username],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(storage_err)
    }
}
