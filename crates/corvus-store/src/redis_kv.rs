// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis-backed key-value store.
//!
//! Batches execute as a single MULTI/EXEC pipeline, so a
//! [`KvPipeline`](corvus_core::KvPipeline) either applies fully or not at
//! all. The connection manager reconnects transparently and is safe for
//! concurrent use.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use corvus_core::{CorvusError, KvOp, KvStore};

/// Production KV backend over a shared Redis connection.
#[derive(Clone)]
pub struct RedisKv {
    conn: ConnectionManager,
}

impl RedisKv {
    /// Connects to Redis at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, CorvusError> {
        let client = redis::Client::open(url)
            .map_err(|e| CorvusError::storage(format!("invalid redis url {url}"), e))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| CorvusError::storage("failed to connect to redis", e))?;
        Ok(Self { conn })
    }

    /// Wraps an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CorvusError> {
        let mut conn = self.conn.clone();
        conn.get(key)
            .await
            .map_err(|e| CorvusError::storage(format!("GET {key} failed"), e))
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CorvusError> {
        let mut conn = self.conn.clone();
        conn.set_ex(key, value, ttl.as_secs())
            .await
            .map_err(|e| CorvusError::storage(format!("SETEX {key} failed"), e))
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CorvusError> {
        let mut conn = self.conn.clone();
        conn.smembers(key)
            .await
            .map_err(|e| CorvusError::storage(format!("SMEMBERS {key} failed"), e))
    }

    async fn scard(&self, key: &str) -> Result<u64, CorvusError> {
        let mut conn = self.conn.clone();
        conn.scard(key)
            .await
            .map_err(|e| CorvusError::storage(format!("SCARD {key} failed"), e))
    }

    async fn execute(&self, ops: Vec<KvOp>) -> Result<(), CorvusError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                KvOp::SetEx { key, value, ttl } => {
                    pipe.set_ex(key, value.as_slice(), ttl.as_secs()).ignore();
                }
                KvOp::Del { key } => {
                    pipe.del(key).ignore();
                }
                KvOp::SAdd { key, member } => {
                    pipe.sadd(key, member).ignore();
                }
                KvOp::SRem { key, member } => {
                    pipe.srem(key, member).ignore();
                }
                KvOp::Expire { key, ttl } => {
                    pipe.expire(key, ttl.as_secs() as i64).ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| CorvusError::storage("pipeline execution failed", e))?;
        Ok(())
    }
}
