// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Corvus platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Corvus configuration.
///
/// Loaded from TOML files with environment variable overrides. Every
/// section is optional and defaults to local-development values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CorvusConfig {
    /// Logging settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Message bus connection settings.
    #[serde(default)]
    pub bus: BusConfig,

    /// Key-value store settings (refresh tokens, chat history).
    #[serde(default)]
    pub redis: RedisConfig,

    /// Auth service settings.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Vector database settings.
    #[serde(default)]
    pub vector: VectorConfig,

    /// Embedding/generation model connector settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Index service settings.
    #[serde(default)]
    pub index: IndexConfig,

    /// Chat service settings.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Message bus connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// NATS server URL.
    #[serde(default = "default_bus_url")]
    pub url: String,

    /// Default timeout for request/reply calls, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Header keys the metadata-extract middleware binds into handler context.
    #[serde(default = "default_metadata_headers")]
    pub metadata_headers: Vec<String>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            url: default_bus_url(),
            request_timeout_secs: default_request_timeout_secs(),
            metadata_headers: default_metadata_headers(),
        }
    }
}

fn default_bus_url() -> String {
    "nats://127.0.0.1:4222".to_string()
}

fn default_request_timeout_secs() -> u64 {
    5
}

fn default_metadata_headers() -> Vec<String> {
    vec!["X-Request-Id".to_string(), "X-User-Id".to_string()]
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Chat history time-to-live, in seconds.
    #[serde(default = "default_chat_ttl_secs")]
    pub chat_ttl_secs: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            chat_ttl_secs: default_chat_ttl_secs(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/0".to_string()
}

fn default_chat_ttl_secs() -> u64 {
    86_400
}

/// Auth service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Symmetric signing secret for access tokens.
    #[serde(default)]
    pub jwt_secret: Option<String>,

    /// Issuer claim stamped on minted access tokens.
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Access token time-to-live, in seconds.
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: u64,

    /// Refresh token time-to-live, in seconds.
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: u64,

    /// Path to the SQLite database holding users and registration requests.
    #[serde(default = "default_auth_database_path")]
    pub database_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            issuer: default_issuer(),
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            database_path: default_auth_database_path(),
        }
    }
}

fn default_issuer() -> String {
    "corvus-auth".to_string()
}

fn default_access_ttl_secs() -> u64 {
    900
}

fn default_refresh_ttl_secs() -> u64 {
    30 * 24 * 3600
}

fn default_auth_database_path() -> String {
    "corvus-auth.db".to_string()
}

/// Vector database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VectorConfig {
    /// Qdrant REST endpoint.
    #[serde(default = "default_vector_url")]
    pub url: String,

    /// Collection name.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Embedding dimension the collection is created with.
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Distance metric: "cosine", "euclid", or "dot".
    #[serde(default = "default_distance")]
    pub distance: String,

    /// Nearest-neighbor result count for retrieval.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Whether retrieval requests point payloads.
    #[serde(default = "default_with_payload")]
    pub with_payload: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            url: default_vector_url(),
            collection: default_collection(),
            dimension: default_dimension(),
            distance: default_distance(),
            top_k: default_top_k(),
            with_payload: default_with_payload(),
        }
    }
}

fn default_vector_url() -> String {
    "http://127.0.0.1:6333".to_string()
}

fn default_collection() -> String {
    "documents".to_string()
}

fn default_dimension() -> usize {
    768
}

fn default_distance() -> String {
    "cosine".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_with_payload() -> bool {
    true
}

/// Model connector configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Base URL of the Ollama-compatible model server.
    #[serde(default = "default_model_url")]
    pub base_url: String,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Generation model identifier.
    #[serde(default = "default_generation_model")]
    pub generation_model: String,

    /// Sampling temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_model_url(),
            embedding_model: default_embedding_model(),
            generation_model: default_generation_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_model_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_embedding_model() -> String {
    "embeddinggemma".to_string()
}

fn default_generation_model() -> String {
    "gemma3:4b".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

/// Index service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    /// HTTP listen address for the ingestion API.
    #[serde(default = "default_index_addr")]
    pub http_addr: String,

    /// Base directory of the filesystem object store.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    /// Window length of the chunker, in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive windows, in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Upper bound on chunks per document; 0 means unlimited.
    #[serde(default)]
    pub max_chunks: usize,

    /// Bus subject the consumer reads documents from.
    #[serde(default = "default_index_subject")]
    pub subject: String,

    /// Queue group for load-balanced consumption.
    #[serde(default = "default_index_queue")]
    pub queue: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            http_addr: default_index_addr(),
            storage_dir: default_storage_dir(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_chunks: 0,
            subject: default_index_subject(),
            queue: default_index_queue(),
        }
    }
}

fn default_index_addr() -> String {
    "127.0.0.1:8081".to_string()
}

fn default_storage_dir() -> String {
    "corvus-objects".to_string()
}

fn default_chunk_size() -> usize {
    700
}

fn default_chunk_overlap() -> usize {
    80
}

fn default_index_subject() -> String {
    "index.documents".to_string()
}

fn default_index_queue() -> String {
    "index-workers".to_string()
}

/// Chat service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// HTTP listen address for the chat API.
    #[serde(default = "default_chat_addr")]
    pub http_addr: String,

    /// System prompt opening every conversation.
    #[serde(default = "default_base_prompt")]
    pub base_prompt: String,

    /// Prefix introducing the retrieved-context block in the user turn.
    #[serde(default)]
    pub context_prompt: String,

    /// Prefix introducing the raw query in the user turn.
    #[serde(default)]
    pub query_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            http_addr: default_chat_addr(),
            base_prompt: default_base_prompt(),
            context_prompt: String::new(),
            query_prompt: String::new(),
        }
    }
}

fn default_chat_addr() -> String {
    "127.0.0.1:8082".to_string()
}

fn default_base_prompt() -> String {
    "You are a helpful assistant. Answer using the provided context documents \
     when they are relevant."
        .to_string()
}

/// Gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// HTTP listen address.
    #[serde(default = "default_gateway_addr")]
    pub http_addr: String,

    /// Per-process requests-per-second ceiling; exceeding it returns 429.
    #[serde(default = "default_rps")]
    pub rps: u32,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http_addr: default_gateway_addr(),
            rps: default_rps(),
        }
    }
}

fn default_gateway_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_rps() -> u32 {
    50
}
