// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector database adapter over the Qdrant REST API.
//!
//! Implements the [`VectorStore`] trait: idempotent collection bootstrap,
//! bulk point upsert, and nearest-neighbor queries with payload.

pub mod client;

pub use client::{Distance, QdrantClient, QdrantConfig};
