// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory key-value store with the same batch contract as Redis.
//!
//! Batches execute under a single mutex acquisition, giving the
//! all-or-nothing visibility the pipeline contract requires. Expiry is
//! checked lazily on read. Used by tests and single-process deployments.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use corvus_core::{CorvusError, KvOp, KvStore};

enum Entry {
    Value(Vec<u8>),
    Set(HashSet<String>),
}

struct Slot {
    entry: Entry,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| at <= Instant::now())
    }
}

/// Mutex-held-batch KV backend.
#[derive(Default)]
pub struct MemoryKv {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply(slots: &mut HashMap<String, Slot>, op: KvOp) {
        match op {
            KvOp::SetEx { key, value, ttl } => {
                slots.insert(
                    key,
                    Slot {
                        entry: Entry::Value(value),
                        expires_at: Some(Instant::now() + ttl),
                    },
                );
            }
            KvOp::Del { key } => {
                slots.remove(&key);
            }
            KvOp::SAdd { key, member } => {
                let slot = slots.entry(key).or_insert_with(|| Slot {
                    entry: Entry::Set(HashSet::new()),
                    expires_at: None,
                });
                if slot.is_expired() {
                    slot.entry = Entry::Set(HashSet::new());
                    slot.expires_at = None;
                }
                match &mut slot.entry {
                    Entry::Set(members) => {
                        members.insert(member);
                    }
                    // A plain value under this key is replaced by a set.
                    Entry::Value(_) => {
                        let mut members = HashSet::new();
                        members.insert(member);
                        slot.entry = Entry::Set(members);
                    }
                }
            }
            KvOp::SRem { key, member } => {
                if let Some(slot) = slots.get_mut(&key) {
                    if let Entry::Set(members) = &mut slot.entry {
                        members.remove(&member);
                    }
                }
            }
            KvOp::Expire { key, ttl } => {
                if let Some(slot) = slots.get_mut(&key) {
                    slot.expires_at = Some(Instant::now() + ttl);
                }
            }
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CorvusError> {
        let mut slots = self.slots.lock().await;
        match slots.get(key) {
            Some(slot) if slot.is_expired() => {
                slots.remove(key);
                Ok(None)
            }
            Some(Slot {
                entry: Entry::Value(value),
                ..
            }) => Ok(Some(value.clone())),
            _ => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CorvusError> {
        let mut slots = self.slots.lock().await;
        Self::apply(
            &mut slots,
            KvOp::SetEx {
                key: key.to_string(),
                value: value.to_vec(),
                ttl,
            },
        );
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CorvusError> {
        let mut slots = self.slots.lock().await;
        match slots.get(key) {
            Some(slot) if slot.is_expired() => {
                slots.remove(key);
                Ok(Vec::new())
            }
            Some(Slot {
                entry: Entry::Set(members),
                ..
            }) => {
                let mut out: Vec<String> = members.iter().cloned().collect();
                out.sort();
                Ok(out)
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn scard(&self, key: &str) -> Result<u64, CorvusError> {
        Ok(self.smembers(key).await?.len() as u64)
    }

    async fn execute(&self, ops: Vec<KvOp>) -> Result<(), CorvusError> {
        // Single lock acquisition across the whole batch.
        let mut slots = self.slots.lock().await;
        for op in ops {
            Self::apply(&mut slots, op);
        }
        Ok(())
    }
}
