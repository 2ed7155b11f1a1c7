// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording vector store double.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use corvus_core::{CorvusError, ScoredPoint, VectorPoint, VectorStore};

/// Vector store that records upserts and answers queries from a script.
#[derive(Default)]
pub struct RecordingVectorStore {
    upserts: Mutex<Vec<Vec<VectorPoint>>>,
    query_results: Mutex<Vec<ScoredPoint>>,
    queries: Mutex<Vec<Vec<f32>>>,
    fail_upserts: AtomicBool,
    collection_ensured: AtomicBool,
}

impl RecordingVectorStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pre-loads the result set every query will return.
    pub fn with_query_results(results: Vec<ScoredPoint>) -> Arc<Self> {
        let store = Self::default();
        *store.query_results.try_lock().expect("fresh store") = results;
        Arc::new(store)
    }

    /// Makes subsequent upserts fail with `upsert_error`.
    pub fn fail_upserts(&self) {
        self.fail_upserts.store(true, Ordering::SeqCst);
    }

    /// Every batch passed to `upsert`, in call order.
    pub async fn upserted_batches(&self) -> Vec<Vec<VectorPoint>> {
        self.upserts.lock().await.clone()
    }

    /// Every query vector seen.
    pub async fn queries(&self) -> Vec<Vec<f32>> {
        self.queries.lock().await.clone()
    }

    pub fn was_collection_ensured(&self) -> bool {
        self.collection_ensured.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for RecordingVectorStore {
    async fn ensure_collection(&self) -> Result<(), CorvusError> {
        self.collection_ensured.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), CorvusError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(CorvusError::Upsert {
                message: "mock upsert failure".to_string(),
                source: None,
            });
        }
        self.upserts.lock().await.push(points);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        _with_payload: bool,
    ) -> Result<Vec<ScoredPoint>, CorvusError> {
        self.queries.lock().await.push(vector.to_vec());
        let results = self.query_results.lock().await;
        Ok(results.iter().take(limit).cloned().collect())
    }
}
