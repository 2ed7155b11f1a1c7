// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Refresh-token store with multi-device support.
//!
//! Key layout over the KV backend:
//! - `refresh_token:data:{token}` -> serialized record, TTL = refresh lifetime
//! - `refresh_token:user:{user_id}:tokens` -> set of token values, same TTL
//!
//! The data namespace doubles as the reverse index: lookup by token value
//! is a single GET. The user set may briefly lag the data keys after a
//! bulk delete; readers treat a missing data key as a dead token and skip it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use corvus_core::{CorvusError, KvPipeline, KvStore, RefreshToken};

/// Multi-device refresh-token store over a shared KV backend.
pub struct TokenStore {
    kv: Arc<dyn KvStore>,
}

fn data_key(token: &str) -> String {
    format!("refresh_token:data:{token}")
}

fn user_set_key(user_id: Uuid) -> String {
    format!("refresh_token:user:{user_id}:tokens")
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Stores a token record and registers it in the owner's set.
    ///
    /// One atomic batch: set data key, add to set, refire the set TTL.
    pub async fn store(&self, token: &RefreshToken, ttl: Duration) -> Result<(), CorvusError> {
        let payload = serde_json::to_vec(token)?;
        let set_key = user_set_key(token.user_id);

        let ops = KvPipeline::new()
            .set_ex(data_key(&token.token), payload, ttl)
            .sadd(set_key.clone(), token.token.clone())
            .expire(set_key, ttl)
            .into_ops();
        self.kv.execute(ops).await?;

        info!(
            user_id = %token.user_id,
            device_id = %token.device_id,
            ttl_secs = ttl.as_secs(),
            "stored refresh token"
        );
        Ok(())
    }

    /// Reverse lookup by token value.
    pub async fn get_by_value(&self, token_value: &str) -> Result<RefreshToken, CorvusError> {
        let data = self.kv.get(&data_key(token_value)).await?;
        match data {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                debug!("refresh token not found");
                Err(CorvusError::TokenNotFound)
            }
        }
    }

    /// Deletes one token record and its set membership. Idempotent.
    pub async fn delete(&self, user_id: Uuid, token_value: &str) -> Result<(), CorvusError> {
        let ops = KvPipeline::new()
            .del(data_key(token_value))
            .srem(user_set_key(user_id), token_value)
            .into_ops();
        self.kv.execute(ops).await?;

        info!(user_id = %user_id, "deleted refresh token");
        Ok(())
    }

    /// Deletes every token owned by the user plus the set itself.
    pub async fn delete_all(&self, user_id: Uuid) -> Result<(), CorvusError> {
        let set_key = user_set_key(user_id);
        let tokens = self.kv.smembers(&set_key).await?;
        if tokens.is_empty() {
            debug!(user_id = %user_id, "no tokens to delete");
            return Ok(());
        }

        let mut pipe = KvPipeline::new();
        for token in &tokens {
            pipe = pipe.del(data_key(token));
        }
        pipe = pipe.del(set_key);
        self.kv.execute(pipe.into_ops()).await?;

        info!(user_id = %user_id, token_count = tokens.len(), "deleted all refresh tokens");
        Ok(())
    }

    /// Number of live tokens in the user's set.
    pub async fn count_active(&self, user_id: Uuid) -> Result<u64, CorvusError> {
        self.kv.scard(&user_set_key(user_id)).await
    }

    /// All live token records for the user, one per device session.
    ///
    /// Set members whose data key has vanished are skipped; the set is
    /// eventually consistent with the data namespace.
    pub async fn list_devices(&self, user_id: Uuid) -> Result<Vec<RefreshToken>, CorvusError> {
        let tokens = self.kv.smembers(&user_set_key(user_id)).await?;

        let mut records = Vec::with_capacity(tokens.len());
        for token_value in tokens {
            match self.get_by_value(&token_value).await {
                Ok(record) => records.push(record),
                Err(CorvusError::TokenNotFound) => {
                    warn!(user_id = %user_id, "set member without data key, skipping");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    /// Deletes every token minted from the given device.
    pub async fn delete_by_device(
        &self,
        user_id: Uuid,
        device_id: &str,
    ) -> Result<(), CorvusError> {
        let records = self.list_devices(user_id).await?;

        let mut deleted = 0u32;
        for record in records {
            if record.device_id == device_id {
                self.delete(user_id, &record.token).await?;
                deleted += 1;
            }
        }

        info!(user_id = %user_id, device_id = %device_id, deleted, "deleted tokens for device");
        Ok(())
    }

    /// Existence + expiry probe for a token value.
    pub async fn is_valid(&self, token_value: &str) -> bool {
        match self.get_by_value(token_value).await {
            Ok(record) => chrono::Utc::now() < record.expires_at,
            Err(_) => false,
        }
    }
}
