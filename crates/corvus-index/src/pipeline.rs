// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document indexing pipeline: resolve -> normalize -> chunk -> embed -> upsert.
//!
//! Stages run in strict order per document. Chunks embed sequentially in
//! ordinal order and land in the vector database as one batched upsert,
//! so a failing document never leaves partial points behind.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use corvus_core::{Chunk, CorvusError, Document, EmbeddingModel, VectorPoint, VectorStore};

use crate::chunker::{split_text, ChunkerConfig};
use crate::storage::FsStore;

/// The ingestion pipeline over its three collaborators.
pub struct Pipeline {
    chunker: ChunkerConfig,
    embedder: Arc<dyn EmbeddingModel>,
    vectors: Arc<dyn VectorStore>,
    storage: Arc<FsStore>,
}

impl Pipeline {
    pub fn new(
        chunker: ChunkerConfig,
        embedder: Arc<dyn EmbeddingModel>,
        vectors: Arc<dyn VectorStore>,
        storage: Arc<FsStore>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            vectors,
            storage,
        }
    }

    /// Indexes one document; returns the number of points written.
    pub async fn index(&self, doc: &Document) -> Result<usize, CorvusError> {
        // Stage 1: source resolution. Inline content wins (legacy API);
        // otherwise the blob is read from the object store.
        let content = if !doc.content.is_empty() {
            doc.content.clone()
        } else if !doc.file_path.is_empty() {
            let bytes = self.storage.get(&doc.file_path).await?;
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            return Err(CorvusError::EmptyDocument);
        };

        // Stage 2: normalization.
        let content = content.trim();
        if content.is_empty() {
            return Err(CorvusError::EmptyDocument);
        }

        // Stage 3: chunking.
        let text_chunks = split_text(&self.chunker, content);
        if text_chunks.is_empty() {
            return Err(CorvusError::NoChunksGenerated);
        }

        // Stage 4: embedding, sequential in ordinal order.
        let mut chunks = Vec::with_capacity(text_chunks.len());
        for tc in text_chunks {
            let embedding = self.embedder.embed(&tc.text).await?;
            chunks.push(Chunk {
                document_id: doc.id.clone(),
                ordinal: tc.ordinal,
                text: tc.text,
                embedding,
                metadata: doc.metadata.clone(),
            });
        }

        // Stage 5: one batched upsert for the whole document.
        let points = points_from_chunks(&chunks);
        let count = points.len();
        self.vectors.upsert(points).await?;

        info!(document_id = %doc.id, chunks = count, "document indexed");
        Ok(count)
    }
}

/// Maps chunks to vector points with fresh ids.
///
/// Payload carries `document_id`, `ordinal`, and `text`, then document
/// metadata merged with chunk metadata (chunk wins on collision).
/// Chunks without an embedding are dropped.
pub fn points_from_chunks(chunks: &[Chunk]) -> Vec<VectorPoint> {
    chunks
        .iter()
        .filter(|chunk| !chunk.embedding.is_empty())
        .map(|chunk| {
            let mut payload: HashMap<String, serde_json::Value> = HashMap::new();
            payload.insert(
                "document_id".to_string(),
                serde_json::json!(chunk.document_id),
            );
            payload.insert("ordinal".to_string(), serde_json::json!(chunk.ordinal));
            payload.insert("text".to_string(), serde_json::json!(chunk.text));
            for (k, v) in &chunk.metadata {
                payload.insert(k.clone(), serde_json::json!(v));
            }

            VectorPoint {
                id: Uuid::new_v4().to_string(),
                vector: chunk.embedding.clone(),
                payload,
            }
        })
        .collect()
}
