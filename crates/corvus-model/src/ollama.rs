// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for an Ollama-compatible model server.
//!
//! Chat generation streams newline-delimited JSON chunks; the parser
//! tolerates lines split across network frames. Transient errors (429,
//! 5xx) are retried once after a one-second delay.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use corvus_core::{
    ChatMessage, CorvusError, EmbeddingModel, GenerationChunk, GenerationModel, GenerationStream,
};

/// Connection settings for the model server.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Base URL, e.g. `http://127.0.0.1:11434`.
    pub base_url: String,
    pub embedding_model: String,
    pub generation_model: String,
    pub temperature: f32,
}

/// Ollama connector implementing both model traits.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    config: OllamaConfig,
    max_retries: u32,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f64>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    created_at: Option<chrono::DateTime<Utc>>,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, CorvusError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| CorvusError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            max_retries: 1,
        })
    }

    async fn post_with_retry(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<reqwest::Response, CorvusError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, url, "retrying model request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .http
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|e| CorvusError::Embed {
                    message: format!("model request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "model response received");

            if status.is_success() {
                return Ok(response);
            }

            let body_text = response.text().await.unwrap_or_default();
            let err = CorvusError::Embed {
                message: format!("model server returned {status}: {body_text}"),
                source: None,
            };
            if is_transient(status) && attempt < self.max_retries {
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error.unwrap_or_else(|| CorvusError::Embed {
            message: "model request failed after retries".to_string(),
            source: None,
        }))
    }
}

fn is_transient(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[async_trait]
impl EmbeddingModel for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CorvusError> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            prompt: text,
        };

        let response = self.post_with_retry(&url, &request).await?;
        let parsed: EmbeddingResponse = response.json().await.map_err(|e| CorvusError::Embed {
            message: format!("failed to parse embedding response: {e}"),
            source: Some(Box::new(e)),
        })?;

        Ok(parsed.embedding.into_iter().map(|v| v as f32).collect())
    }
}

#[async_trait]
impl GenerationModel for OllamaClient {
    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<GenerationStream, CorvusError> {
        let url = format!("{}/api/chat", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.generation_model,
            messages: &messages,
            stream: true,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self.post_with_retry(&url, &request).await?;
        Ok(parse_ndjson_stream(response))
    }
}

struct NdjsonState {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<bytes::Bytes>> + Send>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Parses a newline-delimited JSON response body into generation chunks.
///
/// Lines may arrive split across frames; the buffer carries partial lines
/// forward. A trailing line without newline is parsed at end of stream.
fn parse_ndjson_stream(response: reqwest::Response) -> GenerationStream {
    let state = NdjsonState {
        inner: Box::pin(response.bytes_stream()),
        buffer: Vec::new(),
        finished: false,
    };

    Box::pin(futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            // Drain complete lines from the buffer first.
            if let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                let line = &line[..line.len() - 1];
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                return Some((parse_chunk(line), state));
            }

            match state.inner.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((
                        Err(CorvusError::Bus {
                            message: format!("generation stream error: {e}"),
                            source: Some(Box::new(e)),
                        }),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    if state.buffer.iter().all(u8::is_ascii_whitespace) {
                        return None;
                    }
                    let line = std::mem::take(&mut state.buffer);
                    return Some((parse_chunk(&line), state));
                }
            }
        }
    }))
}

fn parse_chunk(line: &[u8]) -> Result<GenerationChunk, CorvusError> {
    let chunk: ChatChunk = serde_json::from_slice(line)?;
    Ok(GenerationChunk {
        done: chunk.done,
        message: chunk.message.unwrap_or_else(|| ChatMessage::assistant("")),
        created_at: chunk.created_at.unwrap_or_else(Utc::now),
    })
}
