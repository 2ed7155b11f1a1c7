// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-value backends for the Corvus platform.
//!
//! [`RedisKv`] is the production backend; multi-command batches run as a
//! single MULTI/EXEC pipeline. [`MemoryKv`] emulates the same contract
//! with a mutex held across the batch, for tests and single-process
//! deployments.

pub mod memory_kv;
pub mod redis_kv;

pub use memory_kv::MemoryKv;
pub use redis_kv::RedisKv;
