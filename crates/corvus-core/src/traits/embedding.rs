// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding model connector trait.

use async_trait::async_trait;

use crate::error::CorvusError;

/// Connector producing vector embeddings from text.
///
/// Both the index pipeline and the chat service embed through this seam;
/// the returned vector must have the collection's configured dimension.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Generates an embedding vector for the given text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CorvusError>;
}
