// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation model connector trait for streaming chat completion.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::CorvusError;
use crate::types::{ChatMessage, GenerationChunk};

/// A stream of generation chunks; the final chunk reports `done = true`.
pub type GenerationStream =
    Pin<Box<dyn Stream<Item = Result<GenerationChunk, CorvusError>> + Send>>;

/// Connector driving a chat generation model in streaming mode.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Starts a streaming completion over the assembled message array.
    ///
    /// Dropping the returned stream aborts the generation.
    async fn chat_stream(&self, messages: Vec<ChatMessage>) -> Result<GenerationStream, CorvusError>;
}
