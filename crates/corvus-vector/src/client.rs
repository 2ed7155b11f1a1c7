// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Qdrant collections and points endpoints.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use corvus_core::{CorvusError, ScoredPoint, VectorPoint, VectorStore};

/// Distance metric used when the collection is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Distance {
    Cosine,
    Euclid,
    Dot,
}

impl Distance {
    /// Parses a config string, defaulting to cosine for unknown values.
    pub fn from_config(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "euclid" => Distance::Euclid,
            "dot" => Distance::Dot,
            _ => Distance::Cosine,
        }
    }
}

/// Connection settings for the Qdrant adapter.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    /// Base REST URL, e.g. `http://127.0.0.1:6333`.
    pub url: String,
    pub collection: String,
    /// Vector dimension the collection is created with.
    pub dimension: usize,
    pub distance: Distance,
}

/// Qdrant REST client implementing [`VectorStore`].
#[derive(Debug, Clone)]
pub struct QdrantClient {
    http: reqwest::Client,
    config: QdrantConfig,
}

#[derive(Serialize)]
struct CreateCollectionBody {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: Distance,
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    points: &'a [VectorPoint],
}

#[derive(Serialize)]
struct QueryBody<'a> {
    query: &'a [f32],
    limit: usize,
    with_payload: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Deserialize)]
struct QueryResult {
    #[serde(default)]
    points: Vec<RawPoint>,
}

#[derive(Deserialize)]
struct RawPoint {
    id: serde_json::Value,
    score: f32,
    #[serde(default)]
    payload: HashMap<String, serde_json::Value>,
}

impl QdrantClient {
    pub fn new(config: QdrantConfig) -> Result<Self, CorvusError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CorvusError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.config.url, self.config.collection)
    }
}

#[async_trait]
impl VectorStore for QdrantClient {
    async fn ensure_collection(&self) -> Result<(), CorvusError> {
        let response = self
            .http
            .get(self.collection_url())
            .send()
            .await
            .map_err(|e| CorvusError::storage("collection existence check failed", e))?;

        if response.status().is_success() {
            debug!(collection = %self.config.collection, "collection already exists");
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(CorvusError::Storage {
                message: format!(
                    "collection check returned {}",
                    response.status()
                ),
                source: None,
            });
        }

        info!(
            collection = %self.config.collection,
            dimension = self.config.dimension,
            "creating collection"
        );
        let body = CreateCollectionBody {
            vectors: VectorParams {
                size: self.config.dimension,
                distance: self.config.distance,
            },
        };
        let response = self
            .http
            .put(self.collection_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| CorvusError::storage("collection create failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CorvusError::Storage {
                message: format!("collection create returned {status}: {text}"),
                source: None,
            });
        }
        Ok(())
    }

    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<(), CorvusError> {
        if points.is_empty() {
            return Ok(());
        }

        let url = format!("{}/points?wait=true", self.collection_url());
        let response = self
            .http
            .put(&url)
            .json(&UpsertBody { points: &points })
            .send()
            .await
            .map_err(|e| CorvusError::Upsert {
                message: "upsert request failed".to_string(),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CorvusError::Upsert {
                message: format!("upsert returned {status}: {text}"),
                source: None,
            });
        }

        debug!(count = points.len(), "points upserted");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        limit: usize,
        with_payload: bool,
    ) -> Result<Vec<ScoredPoint>, CorvusError> {
        let url = format!("{}/points/query", self.collection_url());
        let response = self
            .http
            .post(&url)
            .json(&QueryBody {
                query: vector,
                limit,
                with_payload,
            })
            .send()
            .await
            .map_err(|e| CorvusError::storage("query request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CorvusError::Storage {
                message: format!("query returned {status}: {text}"),
                source: None,
            });
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| CorvusError::storage("failed to parse query response", e))?;

        Ok(parsed
            .result
            .points
            .into_iter()
            .map(|p| ScoredPoint {
                id: point_id_string(&p.id),
                score: p.score,
                payload: p.payload,
            })
            .collect())
    }
}

/// Qdrant point ids come back as either strings (uuids) or integers.
fn point_id_string(id: &serde_json::Value) -> String {
    match id {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(url: &str) -> QdrantConfig {
        QdrantConfig {
            url: url.to_string(),
            collection: "documents".to_string(),
            dimension: 3,
            distance: Distance::Cosine,
        }
    }

    #[test]
    fn distance_parsing_defaults_to_cosine() {
        assert_eq!(Distance::from_config("euclid"), Distance::Euclid);
        assert_eq!(Distance::from_config("Dot"), Distance::Dot);
        assert_eq!(Distance::from_config("cosine"), Distance::Cosine);
        assert_eq!(Distance::from_config("mystery"), Distance::Cosine);
    }

    #[tokio::test]
    async fn ensure_collection_is_noop_when_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "green"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = QdrantClient::new(test_config(&server.uri())).unwrap();
        client.ensure_collection().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_creates_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/collections/documents"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents"))
            .and(body_partial_json(serde_json::json!({
                "vectors": {"size": 3, "distance": "Cosine"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = QdrantClient::new(test_config(&server.uri())).unwrap();
        client.ensure_collection().await.unwrap();
    }

    #[tokio::test]
    async fn upsert_sends_points_in_one_call() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents/points"))
            .and(query_param("wait", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"status": "completed"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = QdrantClient::new(test_config(&server.uri())).unwrap();
        let points = vec![VectorPoint {
            id: uuid::Uuid::new_v4().to_string(),
            vector: vec![1.0, 0.0, 0.0],
            payload: HashMap::from([(
                "document_id".to_string(),
                serde_json::json!("doc-1"),
            )]),
        }];
        client.upsert(points).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_empty_is_a_noop() {
        // No mock mounted: any request would fail the test.
        let server = MockServer::start().await;
        let client = QdrantClient::new(test_config(&server.uri())).unwrap();
        client.upsert(Vec::new()).await.unwrap();
    }

    #[tokio::test]
    async fn upsert_failure_maps_to_upsert_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/documents/points"))
            .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
            .mount(&server)
            .await;

        let client = QdrantClient::new(test_config(&server.uri())).unwrap();
        let points = vec![VectorPoint {
            id: "p1".to_string(),
            vector: vec![0.0; 3],
            payload: HashMap::new(),
        }];
        let err = client.upsert(points).await.unwrap_err();
        assert_eq!(err.code(), "upsert_error");
    }

    #[tokio::test]
    async fn query_returns_scored_points_with_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/documents/points/query"))
            .and(body_partial_json(serde_json::json!({
                "limit": 2,
                "with_payload": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {
                    "points": [
                        {"id": "a1", "score": 0.92, "payload": {"chunk_text": "hello"}},
                        {"id": 7, "score": 0.81}
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = QdrantClient::new(test_config(&server.uri())).unwrap();
        let results = client.query(&[1.0, 0.0, 0.0], 2, true).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a1");
        assert!((results[0].score - 0.92).abs() < f32::EPSILON);
        assert_eq!(
            results[0].payload.get("chunk_text"),
            Some(&serde_json::json!("hello"))
        );
        // Integer ids are stringified.
        assert_eq!(results[1].id, "7");
        assert!(results[1].payload.is_empty());
    }
}
