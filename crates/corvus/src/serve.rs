// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service wiring for `corvus serve <service>`.
//!
//! Each runner builds its dependency graph from configuration, starts
//! the service, and blocks until the shutdown token fires. Constructors
//! receive every collaborator explicitly; the only process-global is the
//! tracing subscriber.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use corvus_auth::{
    AuthHandlers, AuthService, EventPublisher, JwtManager, RegistrationService, SqliteRepository,
    TokenStore,
};
use corvus_bus::{logging, recover, BusClient};
use corvus_chat::service::RetrievalConfig;
use corvus_chat::{ChatService, HistoryStore, PromptConfig};
use corvus_config::CorvusConfig;
use corvus_core::{CorvusError, VectorStore};
use corvus_gateway::{AuthConnector, DocumentConnector, GatewayState, RateLimiter};
use corvus_index::consumer::ConsumerConfig;
use corvus_index::http::IndexState;
use corvus_index::{ChunkerConfig, FsStore, IndexConsumer, Pipeline};
use corvus_model::{OllamaClient, OllamaConfig};
use corvus_store::RedisKv;
use corvus_vector::{Distance, QdrantClient, QdrantConfig};

/// Initializes the tracing subscriber once per process.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn connect_bus(config: &CorvusConfig) -> Result<BusClient, CorvusError> {
    Ok(BusClient::connect(&config.bus.url)
        .await?
        .with_request_timeout(Duration::from_secs(config.bus.request_timeout_secs))
        .with_middleware(recover())
        .with_middleware(logging())
        .with_middleware(corvus_bus::metadata_extract(
            config.bus.metadata_headers.clone(),
        )))
}

fn model_client(config: &CorvusConfig) -> Result<Arc<OllamaClient>, CorvusError> {
    Ok(Arc::new(OllamaClient::new(OllamaConfig {
        base_url: config.model.base_url.clone(),
        embedding_model: config.model.embedding_model.clone(),
        generation_model: config.model.generation_model.clone(),
        temperature: config.model.temperature,
    })?))
}

fn vector_client(config: &CorvusConfig) -> Result<Arc<QdrantClient>, CorvusError> {
    Ok(Arc::new(QdrantClient::new(QdrantConfig {
        url: config.vector.url.clone(),
        collection: config.vector.collection.clone(),
        dimension: config.vector.dimension,
        distance: Distance::from_config(&config.vector.distance),
    })?))
}

/// Runs the auth service until shutdown.
pub async fn run_auth(config: CorvusConfig) -> Result<(), CorvusError> {
    let secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| CorvusError::Config("auth.jwt_secret is required".to_string()))?;

    let bus = connect_bus(&config).await?;
    let kv = Arc::new(RedisKv::connect(&config.redis.url).await?);
    let repo = Arc::new(SqliteRepository::open(&config.auth.database_path).await?);

    let jwt = JwtManager::new(
        &secret,
        &config.auth.issuer,
        Duration::from_secs(config.auth.access_ttl_secs),
        Duration::from_secs(config.auth.refresh_ttl_secs),
    );
    let auth = Arc::new(AuthService::new(
        repo.clone(),
        TokenStore::new(kv),
        jwt,
    ));
    let registration = Arc::new(RegistrationService::new(repo.clone(), repo));
    let publisher = EventPublisher::new(bus.clone());

    let handlers = AuthHandlers::new(auth, registration, publisher, config.auth.access_ttl_secs);
    let subscriptions = handlers.start(&bus).await?;

    info!("auth service running");
    let shutdown = crate::shutdown::install_signal_handler();
    shutdown.cancelled().await;

    for handle in subscriptions {
        handle.abort();
    }
    info!("auth service stopped");
    Ok(())
}

/// Runs the index service until shutdown.
pub async fn run_index(config: CorvusConfig) -> Result<(), CorvusError> {
    let bus = connect_bus(&config).await?;
    let storage = Arc::new(FsStore::new(config.index.storage_dir.clone()).await?);
    let vectors = vector_client(&config)?;
    vectors.ensure_collection().await?;
    let model = model_client(&config)?;

    let pipeline = Arc::new(Pipeline::new(
        ChunkerConfig {
            chunk_size: config.index.chunk_size,
            chunk_overlap: config.index.chunk_overlap,
            max_chunks: config.index.max_chunks,
        },
        model,
        vectors,
        storage.clone(),
    ));

    let shutdown = crate::shutdown::install_signal_handler();

    let consumer = IndexConsumer::new(
        ConsumerConfig {
            subject: config.index.subject.clone(),
            durable: config.index.queue.clone(),
            ..Default::default()
        },
        pipeline.clone(),
    );
    let consumer_client = bus.raw().clone();
    let consumer_shutdown = shutdown.clone();
    let consumer_task =
        tokio::spawn(async move { consumer.run(consumer_client, consumer_shutdown).await });

    let state = IndexState { pipeline, storage };
    let http_addr = config.index.http_addr.clone();

    info!("index service running");
    tokio::select! {
        result = corvus_index::http::serve(&http_addr, state) => result?,
        _ = shutdown.cancelled() => {}
    }

    let _ = consumer_task.await;
    info!("index service stopped");
    Ok(())
}

/// Runs the chat service until shutdown.
pub async fn run_chat(config: CorvusConfig) -> Result<(), CorvusError> {
    let kv = Arc::new(RedisKv::connect(&config.redis.url).await?);
    let vectors = vector_client(&config)?;
    vectors.ensure_collection().await?;
    let model = model_client(&config)?;

    let service = Arc::new(ChatService::new(
        model.clone(),
        model,
        vectors,
        HistoryStore::new(kv, Duration::from_secs(config.redis.chat_ttl_secs)),
        PromptConfig {
            base_prompt: config.chat.base_prompt.clone(),
            context_prompt: config.chat.context_prompt.clone(),
            query_prompt: config.chat.query_prompt.clone(),
        },
        RetrievalConfig {
            top_k: config.vector.top_k,
            with_payload: config.vector.with_payload,
        },
    ));

    let shutdown = crate::shutdown::install_signal_handler();
    let state = corvus_chat::http::ChatState { service };

    info!("chat service running");
    tokio::select! {
        result = corvus_chat::http::serve(&config.chat.http_addr, state) => result?,
        _ = shutdown.cancelled() => {}
    }
    info!("chat service stopped");
    Ok(())
}

/// Runs the gateway until shutdown.
pub async fn run_gateway(config: CorvusConfig) -> Result<(), CorvusError> {
    let bus = connect_bus(&config).await?;

    let state = GatewayState {
        auth: AuthConnector::new(bus.clone()),
        documents: DocumentConnector::new(bus),
        limiter: RateLimiter::new(config.gateway.rps),
    };

    let shutdown = crate::shutdown::install_signal_handler();

    info!("gateway running");
    tokio::select! {
        result = corvus_gateway::serve(&config.gateway.http_addr, state) => result?,
        _ = shutdown.cancelled() => {}
    }
    info!("gateway stopped");
    Ok(())
}
