// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat service: retrieval-augmented generation with token streaming.
//!
//! Each turn embeds the query, retrieves nearest documents, assembles
//! the working context (base prompt + retrieved docs + history + user
//! turn), streams generation chunks to the caller, and commits the
//! rolling history to the key-value store.

pub mod history;
pub mod http;
pub mod prompt;
pub mod service;

pub use history::HistoryStore;
pub use prompt::PromptConfig;
pub use service::ChatService;
