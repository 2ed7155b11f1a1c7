// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface for the chat service.
//!
//! `POST /api/v1/chat` streams newline-delimited JSON chunks as the
//! generation produces them; `DELETE /api/v1/chat/:user_id` clears the
//! user's history.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use corvus_core::CorvusError;

use crate::service::ChatService;

/// Shared state for the chat routes.
#[derive(Clone)]
pub struct ChatState {
    pub service: Arc<ChatService>,
}

/// Request body for a chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub input: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

/// Builds the chat router.
pub fn router(state: ChatState) -> Router {
    Router::new()
        .route("/api/v1/chat", post(chat))
        .route("/api/v1/chat/:user_id", delete(clear_chat))
        .with_state(state)
}

/// Serves the chat API until the listener fails.
pub async fn serve(addr: &str, state: ChatState) -> Result<(), CorvusError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CorvusError::bus(format!("failed to bind chat API to {addr}"), e))?;
    info!(addr, "chat API listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| CorvusError::bus("chat API server error", e))
}

async fn chat(State(state): State<ChatState>, Json(req): Json<ChatRequest>) -> Response {
    if req.user_id.is_empty() || req.input.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "user_id and input are required".to_string(),
            }),
        )
            .into_response();
    }

    let (tx, rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let cancel = CancellationToken::new();
    let service = state.service.clone();

    // The processing task mirrors every callback invocation as one
    // NDJSON line; the response body drains the channel. Dropping the
    // body (client disconnect) closes the channel, the send fails, and
    // the turn ends without committing the assistant message.
    tokio::spawn(async move {
        let sender = tx;
        let result = service
            .process_input(&cancel, &req.user_id, &req.input, |chunk| {
                let mut line = serde_json::to_vec(chunk)?;
                line.push(b'\n');
                sender
                    .send(line)
                    .map_err(|_| CorvusError::Cancelled)
            })
            .await;

        if let Err(e) = result {
            error!(error = %e, "chat turn failed");
        }
    });

    let body_stream = futures::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|bytes| (Ok::<_, std::convert::Infallible>(bytes), rx))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .header(header::CACHE_CONTROL, "no-cache")
        .header("X-Content-Type-Options", "nosniff")
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

async fn clear_chat(State(state): State<ChatState>, Path(user_id): Path<String>) -> Response {
    if user_id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "user_id is required".to_string(),
            }),
        )
            .into_response();
    }

    match state.service.clear_user_chat(&user_id).await {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: "chat history cleared".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!(user_id, error = %e, "could not clear chat history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "could not clear chat history".to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::http::Request;
    use tower::ServiceExt;

    use corvus_core::ScoredPoint;
    use corvus_store::MemoryKv;
    use corvus_test_utils::{MockEmbedder, MockGenerator, RecordingVectorStore};

    use crate::history::HistoryStore;
    use crate::prompt::PromptConfig;
    use crate::service::RetrievalConfig;

    fn scored(id: &str, text: &str) -> ScoredPoint {
        ScoredPoint {
            id: id.to_string(),
            score: 0.8,
            payload: HashMap::from([("text".to_string(), serde_json::json!(text))]),
        }
    }

    fn test_state(pieces: Vec<&str>) -> (ChatState, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        let service = Arc::new(ChatService::new(
            MockEmbedder::returning(vec![0.1, 0.2]),
            MockGenerator::streaming(pieces),
            RecordingVectorStore::with_query_results(vec![
                scored("a", "alpha doc"),
                scored("b", "beta doc"),
            ]),
            HistoryStore::new(kv.clone(), Duration::from_secs(3600)),
            PromptConfig::default(),
            RetrievalConfig::default(),
        ));
        (ChatState { service }, kv)
    }

    #[tokio::test]
    async fn chat_streams_ndjson_chunks_then_done() {
        let (state, kv) = test_state(vec!["Hi ", "there", "."]);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"user_id": "u1", "input": "Hello"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/x-ndjson"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let lines: Vec<serde_json::Value> = String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0]["message"]["content"], "Hi ");
        assert_eq!(lines[0]["done"], false);
        assert_eq!(lines[1]["message"]["content"], "there");
        assert_eq!(lines[2]["message"]["content"], ".");
        assert_eq!(lines[3]["done"], true);

        // History committed: user turn then assembled assistant turn.
        let history = HistoryStore::new(kv, Duration::from_secs(3600))
            .retrieve("u1")
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "Hello");
        assert_eq!(history[1].content, "Hi there.");
    }

    #[tokio::test]
    async fn chat_rejects_missing_fields() {
        let (state, _) = test_state(vec!["x"]);
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/chat")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"user_id": "", "input": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_clears_history() {
        let (state, kv) = test_state(vec!["x"]);
        let history = HistoryStore::new(kv.clone(), Duration::from_secs(3600));
        history
            .save_message("u9", corvus_core::ChatMessage::user("old"))
            .await
            .unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/chat/u9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(history.retrieve("u9").await.unwrap().is_empty());
    }
}
