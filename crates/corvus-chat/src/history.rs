// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling chat history over the key-value store.
//!
//! `chat:history:{user_id}` holds the full message array as JSON with a
//! TTL; every append is a read-modify-write of the whole array.
//! Concurrent appends for the same user are last-writer-wins --
//! deployments route a user to a single worker. `chat:temp_msg:{user_id}`
//! is a scratch key cleared together with the history.

use std::sync::Arc;
use std::time::Duration;

use corvus_core::{ChatMessage, CorvusError, KvPipeline, KvStore};

/// Per-user chat history store.
pub struct HistoryStore {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

fn history_key(user_id: &str) -> String {
    format!("chat:history:{user_id}")
}

fn temp_msg_key(user_id: &str) -> String {
    format!("chat:temp_msg:{user_id}")
}

impl HistoryStore {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    /// Loads the user's history; a missing key is an empty history.
    pub async fn retrieve(&self, user_id: &str) -> Result<Vec<ChatMessage>, CorvusError> {
        match self.kv.get(&history_key(user_id)).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    /// Appends one message, rewriting the array and refreshing the TTL.
    pub async fn save_message(
        &self,
        user_id: &str,
        message: ChatMessage,
    ) -> Result<(), CorvusError> {
        let mut history = self.retrieve(user_id).await?;
        history.push(message);

        let payload = serde_json::to_vec(&history)?;
        self.kv
            .set_ex(&history_key(user_id), &payload, self.ttl)
            .await
    }

    /// Deletes the history and the scratch key in one batch.
    pub async fn clear(&self, user_id: &str) -> Result<(), CorvusError> {
        let ops = KvPipeline::new()
            .del(history_key(user_id))
            .del(temp_msg_key(user_id))
            .into_ops();
        self.kv.execute(ops).await
    }

    /// Number of messages currently stored.
    pub async fn size(&self, user_id: &str) -> Result<usize, CorvusError> {
        Ok(self.retrieve(user_id).await?.len())
    }
}
