// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stream consumer for `index.documents`.
//!
//! Pulls from a durable JetStream consumer with explicit acks. A
//! pipeline failure nacks the message so the broker redelivers it after
//! the ack-wait; decode failures and successes ack.

use std::sync::Arc;
use std::time::Duration;

use async_nats::jetstream::{self, consumer::PullConsumer, AckKind};
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use corvus_core::{CorvusError, Document};

use crate::pipeline::Pipeline;

/// Consumer settings.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Stream name holding the subject (no dots allowed).
    pub stream: String,
    /// Subject documents arrive on.
    pub subject: String,
    /// Durable consumer name; doubles as the load-balancing group.
    pub durable: String,
    /// Redelivery window for unacked messages.
    pub ack_wait: Duration,
    /// In-flight ceiling.
    pub max_ack_pending: i64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            stream: "documents".to_string(),
            subject: "index.documents".to_string(),
            durable: "index-workers".to_string(),
            ack_wait: Duration::from_secs(30),
            max_ack_pending: 16,
        }
    }
}

/// Wire shape of an `index.documents` message.
#[derive(Debug, Deserialize)]
struct IndexMessage {
    document_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    file_path: String,
    #[serde(default)]
    source_uri: String,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

/// Durable stream consumer feeding the pipeline.
pub struct IndexConsumer {
    config: ConsumerConfig,
    pipeline: Arc<Pipeline>,
}

impl IndexConsumer {
    pub fn new(config: ConsumerConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { config, pipeline }
    }

    /// Runs the pull loop until `shutdown` is cancelled.
    pub async fn run(
        &self,
        client: async_nats::Client,
        shutdown: CancellationToken,
    ) -> Result<(), CorvusError> {
        let js = jetstream::new(client);

        let stream = js
            .get_or_create_stream(jetstream::stream::Config {
                name: self.config.stream.clone(),
                subjects: vec![self.config.subject.clone()],
                ..Default::default()
            })
            .await
            .map_err(|e| CorvusError::bus("failed to get or create stream", e))?;

        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                &self.config.durable,
                jetstream::consumer::pull::Config {
                    durable_name: Some(self.config.durable.clone()),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ack_wait: self.config.ack_wait,
                    max_ack_pending: self.config.max_ack_pending,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| CorvusError::bus("failed to get or create consumer", e))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| CorvusError::bus("failed to open message stream", e))?;

        info!(
            stream = %self.config.stream,
            subject = %self.config.subject,
            durable = %self.config.durable,
            "index consumer started"
        );

        loop {
            let message = tokio::select! {
                next = messages.next() => next,
                _ = shutdown.cancelled() => {
                    info!("index consumer shutting down");
                    return Ok(());
                }
            };

            let message = match message {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    warn!(error = %e, "message stream error");
                    continue;
                }
                None => {
                    warn!("message stream closed");
                    return Ok(());
                }
            };

            match handle_message(&self.pipeline, &message.payload).await {
                Ok(count) => {
                    info!(chunks = count, "document consumed");
                    if let Err(e) = message.ack().await {
                        warn!(error = %e, "ack failed");
                    }
                }
                // Undecodable payloads can never succeed: ack them away.
                Err(CorvusError::Serialization(e)) => {
                    error!(error = %e, "dropping undecodable message");
                    if let Err(e) = message.ack().await {
                        warn!(error = %e, "ack failed");
                    }
                }
                Err(e) => {
                    error!(error = %e, "pipeline failure, nacking for redelivery");
                    if let Err(e) = message.ack_with(AckKind::Nak(None)).await {
                        warn!(error = %e, "nack failed");
                    }
                }
            }
        }
    }
}

/// Decodes one payload and runs it through the pipeline.
async fn handle_message(pipeline: &Pipeline, payload: &[u8]) -> Result<usize, CorvusError> {
    let msg: IndexMessage = serde_json::from_slice(payload)?;

    let doc = Document {
        id: msg.document_id,
        title: msg.title,
        content: msg.content,
        file_path: msg.file_path,
        source_uri: msg.source_uri,
        metadata: msg.metadata,
    };

    pipeline.index(&doc).await
}
