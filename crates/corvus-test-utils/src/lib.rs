// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic test doubles for the Corvus connector traits.
//!
//! Fast, CI-runnable stand-ins for the embedding model, the generation
//! model, and the vector store, so service tests never touch external
//! processes.

pub mod mock_model;
pub mod mock_vector;

pub use mock_model::{MockEmbedder, MockGenerator};
pub use mock_vector::RecordingVectorStore;
