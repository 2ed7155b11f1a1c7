// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Corvus platform.
//!
//! This crate provides the error taxonomy, domain types, the universal
//! reply envelope, the key-value store abstraction, and the connector
//! traits implemented by the adapter crates. Service crates depend on
//! these seams rather than on concrete backends.

pub mod envelope;
pub mod error;
pub mod kv;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use envelope::Envelope;
pub use error::CorvusError;
pub use kv::{KvOp, KvPipeline, KvStore};
pub use traits::{
    EmbeddingModel, GenerationModel, GenerationStream, RegistrationRepository, UserRepository,
    VectorStore,
};
pub use types::{
    normalize_email, ChatMessage, Chunk, Document, GenerationChunk, RefreshToken,
    RegistrationRequest, RegistrationStatus, ScoredPoint, User, UserRole, VectorPoint,
};
