// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connector traits implemented by the adapter crates.

pub mod embedding;
pub mod generation;
pub mod repository;
pub mod vector;

pub use embedding::EmbeddingModel;
pub use generation::{GenerationModel, GenerationStream};
pub use repository::{RegistrationRepository, UserRepository};
pub use vector::VectorStore;
