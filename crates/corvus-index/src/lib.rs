// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Index service: document ingestion pipeline.
//!
//! Documents arrive over HTTP (multipart upload or legacy inline JSON)
//! or from the `index.documents` stream. Each document is fetched from
//! the object store if needed, chunked, embedded in ordinal order, and
//! written to the vector database as a single batched upsert.

pub mod chunker;
pub mod consumer;
pub mod http;
pub mod pipeline;
pub mod storage;

pub use chunker::{split_text, ChunkerConfig, TextChunk};
pub use consumer::IndexConsumer;
pub use pipeline::Pipeline;
pub use storage::FsStore;
