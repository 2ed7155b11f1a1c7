// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model connector for the Corvus platform.
//!
//! Talks to an Ollama-compatible server: `/api/embeddings` for vectors,
//! `/api/chat` in streaming mode for generation. Implements the
//! [`EmbeddingModel`](corvus_core::EmbeddingModel) and
//! [`GenerationModel`](corvus_core::GenerationModel) connector traits.

pub mod ollama;

pub use ollama::{OllamaClient, OllamaConfig};
