// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector database adapter trait.

use async_trait::async_trait;

use crate::error::CorvusError;
use crate::types::{ScoredPoint, VectorPoint};

/// Adapter over a vector database collection.
///
/// Shared between the index pipeline (writes) and the chat service
/// (nearest-neighbor reads); safe for concurrent use.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection if absent. Idempotent.
    async fn ensure_collection(&self) -> Result<(), CorvusError>;

    /// Bulk insert/replace of points in a single call.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), CorvusError>;

    /// Top-`limit` nearest points to `vector`.
    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        with_payload: bool,
    ) -> Result<Vec<ScoredPoint>, CorvusError>;
}
