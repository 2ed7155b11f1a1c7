// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value store abstraction with atomic multi-command batches.
//!
//! The refresh-token store and the chat history store run over this seam
//! so production Redis and the in-memory test backend are interchangeable.
//! Batches built with [`KvPipeline`] execute all-or-nothing: a backend
//! without native pipelining must emulate with a lock held across the batch.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CorvusError;

/// A single operation inside a pipeline batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    /// Set `key` to `value` with a time-to-live.
    SetEx {
        key: String,
        value: Vec<u8>,
        ttl: Duration,
    },
    /// Delete a key (no-op if absent).
    Del { key: String },
    /// Add a member to the set at `key`.
    SAdd { key: String, member: String },
    /// Remove a member from the set at `key` (no-op if absent).
    SRem { key: String, member: String },
    /// Reset the time-to-live of an existing key.
    Expire { key: String, ttl: Duration },
}

/// Ordered batch of operations executed atomically by [`KvStore::execute`].
#[derive(Debug, Default)]
pub struct KvPipeline {
    ops: Vec<KvOp>,
}

impl KvPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ex(mut self, key: impl Into<String>, value: Vec<u8>, ttl: Duration) -> Self {
        self.ops.push(KvOp::SetEx {
            key: key.into(),
            value,
            ttl,
        });
        self
    }

    pub fn del(mut self, key: impl Into<String>) -> Self {
        self.ops.push(KvOp::Del { key: key.into() });
        self
    }

    pub fn sadd(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(KvOp::SAdd {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn srem(mut self, key: impl Into<String>, member: impl Into<String>) -> Self {
        self.ops.push(KvOp::SRem {
            key: key.into(),
            member: member.into(),
        });
        self
    }

    pub fn expire(mut self, key: impl Into<String>, ttl: Duration) -> Self {
        self.ops.push(KvOp::Expire { key: key.into(), ttl });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<KvOp> {
        self.ops
    }
}

/// Shared key-value backend. All operations are safe for concurrent use.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads a plain value; `None` on miss.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CorvusError>;

    /// Sets a plain value with a time-to-live.
    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CorvusError>;

    /// Members of the set at `key`; empty when the set is absent.
    async fn smembers(&self, key: &str) -> Result<Vec<String>, CorvusError>;

    /// Cardinality of the set at `key`; 0 when absent.
    async fn scard(&self, key: &str) -> Result<u64, CorvusError>;

    /// Executes an ordered batch with all-or-nothing semantics.
    async fn execute(&self, ops: Vec<KvOp>) -> Result<(), CorvusError>;
}
