// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock embedding and generation models.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream;
use tokio::sync::Mutex;

use corvus_core::{
    ChatMessage, CorvusError, EmbeddingModel, GenerationChunk, GenerationModel, GenerationStream,
};

/// Embedding model returning a fixed vector for every input.
///
/// Records inputs so tests can assert call order, and can be switched
/// into a failing mode.
pub struct MockEmbedder {
    vector: Vec<f32>,
    calls: Mutex<Vec<String>>,
    fail: AtomicBool,
    call_count: AtomicUsize,
}

impl MockEmbedder {
    /// Embedder that always returns `vector`.
    pub fn returning(vector: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            vector,
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            call_count: AtomicUsize::new(0),
        })
    }

    /// Makes every subsequent call fail with `embed_error`.
    pub fn fail_from_now(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Inputs seen so far, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingModel for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CorvusError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().await.push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(CorvusError::Embed {
                message: "mock embedder failure".to_string(),
                source: None,
            });
        }
        Ok(self.vector.clone())
    }
}

/// Generation model streaming a scripted chunk sequence.
///
/// Emits each text piece as a not-done chunk, then one final done chunk,
/// mirroring the model server's wire behavior. Captures the message
/// array it was called with.
pub struct MockGenerator {
    pieces: Vec<String>,
    last_messages: Mutex<Option<Vec<ChatMessage>>>,
}

impl MockGenerator {
    pub fn streaming(pieces: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            pieces: pieces.into_iter().map(String::from).collect(),
            last_messages: Mutex::new(None),
        })
    }

    /// The message array from the most recent call.
    pub async fn last_messages(&self) -> Option<Vec<ChatMessage>> {
        self.last_messages.lock().await.clone()
    }
}

#[async_trait]
impl GenerationModel for MockGenerator {
    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<GenerationStream, CorvusError> {
        *self.last_messages.lock().await = Some(messages);

        let mut chunks: Vec<Result<GenerationChunk, CorvusError>> = self
            .pieces
            .iter()
            .map(|piece| {
                Ok(GenerationChunk {
                    done: false,
                    message: ChatMessage::assistant(piece.clone()),
                    created_at: Utc::now(),
                })
            })
            .collect();
        chunks.push(Ok(GenerationChunk {
            done: true,
            message: ChatMessage::assistant(""),
            created_at: Utc::now(),
        }));

        Ok(Box::pin(stream::iter(chunks)))
    }
}
