// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP ingestion surface for the index service.
//!
//! `POST /api/v1/index` takes a multipart upload (file + id + title +
//! source_uri), stores the blob, and indexes by reference.
//! `POST /api/v1/index/json` is the legacy inline-content endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use corvus_core::{CorvusError, Document};

use crate::pipeline::Pipeline;
use crate::storage::FsStore;

/// 100 MB upload ceiling, matching the original ingestion limit.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Shared state for the ingestion routes.
#[derive(Clone)]
pub struct IndexState {
    pub pipeline: Arc<Pipeline>,
    pub storage: Arc<FsStore>,
}

/// Legacy inline-content request body.
#[derive(Debug, Deserialize)]
pub struct IndexJsonRequest {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub source_uri: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Reply for a successful multipart ingestion.
#[derive(Debug, Serialize)]
pub struct IndexAcceptedResponse {
    pub status: String,
    pub id: String,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Builds the ingestion router.
pub fn router(state: IndexState) -> Router {
    Router::new()
        .route("/api/v1/index", post(index_file))
        .route("/api/v1/index/json", post(index_json))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Serves the ingestion API until the listener fails.
pub async fn serve(addr: &str, state: IndexState) -> Result<(), CorvusError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CorvusError::bus(format!("failed to bind index API to {addr}"), e))?;
    info!(addr, "index API listening");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| CorvusError::bus("index API server error", e))
}

async fn index_file(State(state): State<IndexState>, mut multipart: Multipart) -> Response {
    let mut document_id = String::new();
    let mut title = String::new();
    let mut source_uri = String::new();
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_filename = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return bad_request(format!("malformed multipart body: {e}")),
        };

        match field.name().unwrap_or("") {
            "id" => document_id = field.text().await.unwrap_or_default(),
            "title" => title = field.text().await.unwrap_or_default(),
            "source_uri" => source_uri = field.text().await.unwrap_or_default(),
            "file" => {
                original_filename = field.file_name().unwrap_or("").to_string();
                match field.bytes().await {
                    Ok(bytes) => file_bytes = Some(bytes.to_vec()),
                    Err(e) => return bad_request(format!("failed to read file field: {e}")),
                }
            }
            _ => {}
        }
    }

    if document_id.is_empty() {
        return bad_request("id is required".to_string());
    }
    let Some(file_bytes) = file_bytes else {
        return bad_request("file is required".to_string());
    };

    let mut metadata = HashMap::new();
    metadata.insert("original_filename".to_string(), original_filename);
    metadata.insert("size".to_string(), file_bytes.len().to_string());

    let file_path = match state.storage.save(&document_id, &file_bytes).await {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "failed to save upload");
            return internal_error(&e);
        }
    };

    let doc = Document {
        id: document_id.clone(),
        title,
        content: String::new(),
        file_path: file_path.clone(),
        source_uri,
        metadata,
    };

    if let Err(e) = state.pipeline.index(&doc).await {
        error!(document_id = %doc.id, error = %e, "indexing failed");
        return internal_error(&e);
    }

    (
        StatusCode::OK,
        Json(IndexAcceptedResponse {
            status: "accepted".to_string(),
            id: document_id,
            file_path,
        }),
    )
        .into_response()
}

async fn index_json(
    State(state): State<IndexState>,
    Json(req): Json<IndexJsonRequest>,
) -> Response {
    if req.id.is_empty() || req.content.is_empty() {
        return bad_request("id and content are required".to_string());
    }

    let doc = Document {
        id: req.id,
        title: req.title,
        content: req.content,
        file_path: String::new(),
        source_uri: req.source_uri,
        metadata: req.metadata,
    };

    if let Err(e) = state.pipeline.index(&doc).await {
        error!(document_id = %doc.id, error = %e, "indexing failed");
        return internal_error(&e);
    }

    StatusCode::ACCEPTED.into_response()
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

fn internal_error(err: &CorvusError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.code().to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use corvus_test_utils::{MockEmbedder, RecordingVectorStore};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::chunker::ChunkerConfig;

    async fn test_state(
        chunk_size: usize,
        overlap: usize,
    ) -> (IndexState, Arc<RecordingVectorStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FsStore::new(dir.path()).await.unwrap());
        let vectors = RecordingVectorStore::new();
        let pipeline = Arc::new(Pipeline::new(
            ChunkerConfig {
                chunk_size,
                chunk_overlap: overlap,
                max_chunks: 0,
            },
            MockEmbedder::returning(vec![1.0, 0.0, 0.0]),
            vectors.clone(),
            storage.clone(),
        ));
        (
            IndexState { pipeline, storage },
            vectors,
            dir,
        )
    }

    fn multipart_body(boundary: &str, id: &str, content: &str) -> String {
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"id\"\r\n\r\n\
             {id}\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
             Test Title\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"doc.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             {content}\r\n\
             --{boundary}--\r\n"
        )
    }

    #[tokio::test]
    async fn multipart_upload_stores_blob_and_indexes() {
        let (state, vectors, dir) = test_state(25, 5).await;
        let app = router(state);

        let boundary = "XTESTBOUNDARY";
        let body = multipart_body(boundary, "doc-42", "This is a test document. It has two parts.");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/index")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["status"], "accepted");
        assert_eq!(reply["id"], "doc-42");
        let file_path = reply["file_path"].as_str().unwrap();
        assert!(file_path.starts_with("do/doc-42_"));

        // The blob landed on disk with the exact content.
        let on_disk = std::fs::read(dir.path().join(file_path)).unwrap();
        assert_eq!(on_disk, b"This is a test document. It has two parts.");

        // A single upsert with >= 2 ordered points of dimension 3.
        let batches = vectors.upserted_batches().await;
        assert_eq!(batches.len(), 1);
        let points = &batches[0];
        assert!(points.len() >= 2);
        for (i, point) in points.iter().enumerate() {
            assert_eq!(point.vector.len(), 3);
            assert_eq!(point.payload["document_id"], serde_json::json!("doc-42"));
            assert_eq!(point.payload["ordinal"], serde_json::json!(i));
        }
    }

    #[tokio::test]
    async fn multipart_without_id_is_rejected() {
        let (state, _, _dir) = test_state(25, 5).await;
        let app = router(state);

        let boundary = "XTESTBOUNDARY";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"doc.txt\"\r\n\r\n\
             content\r\n\
             --{boundary}--\r\n"
        );
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/index")
                    .header(
                        "content-type",
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn json_endpoint_indexes_inline_content() {
        let (state, vectors, _dir) = test_state(100, 0).await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/index/json")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"id": "doc-legacy", "content": "inline legacy content"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let batches = vectors.upserted_batches().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0][0].payload["document_id"],
            serde_json::json!("doc-legacy")
        );
    }

    #[tokio::test]
    async fn json_endpoint_requires_id_and_content() {
        let (state, _, _dir) = test_state(100, 0).await;
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/index/json")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id": "", "content": ""}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pipeline_failure_maps_to_internal_error() {
        let (state, vectors, _dir) = test_state(100, 0).await;
        vectors.fail_upserts();
        let app = router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/index/json")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id": "doc-x", "content": "some text"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let reply: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(reply["error"], "upsert_error");
    }
}
