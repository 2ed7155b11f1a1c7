// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! RAG chat orchestration.
//!
//! The user turn commits to history before generation starts, so a
//! crash mid-stream still records that the question was asked. The
//! assistant turn commits only when the stream reports done; a
//! cancelled request drops the partial generation.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use corvus_core::{
    ChatMessage, CorvusError, EmbeddingModel, GenerationChunk, GenerationModel, VectorStore,
};

use crate::history::HistoryStore;
use crate::prompt::{build_messages, PromptConfig};

/// Retrieval settings for one chat turn.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Nearest-neighbor result count.
    pub top_k: usize,
    /// Whether to request payloads (needed to render context).
    pub with_payload: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            with_payload: true,
        }
    }
}

/// Chat service over the model connectors, vector store, and history.
pub struct ChatService {
    embedder: Arc<dyn EmbeddingModel>,
    generator: Arc<dyn GenerationModel>,
    vectors: Arc<dyn VectorStore>,
    history: HistoryStore,
    prompt: PromptConfig,
    retrieval: RetrievalConfig,
}

impl ChatService {
    pub fn new(
        embedder: Arc<dyn EmbeddingModel>,
        generator: Arc<dyn GenerationModel>,
        vectors: Arc<dyn VectorStore>,
        history: HistoryStore,
        prompt: PromptConfig,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            generator,
            vectors,
            history,
            prompt,
            retrieval,
        }
    }

    /// Runs one chat turn, invoking `on_chunk` for every streamed chunk.
    ///
    /// The callback runs on the task driving the generation stream and
    /// must not block longer than the connector tolerates.
    pub async fn process_input<F>(
        &self,
        cancel: &CancellationToken,
        user_id: &str,
        input: &str,
        mut on_chunk: F,
    ) -> Result<(), CorvusError>
    where
        F: FnMut(&GenerationChunk) -> Result<(), CorvusError> + Send,
    {
        let query_vector = self.embedder.embed(input).await?;

        let docs = self
            .vectors
            .query(
                &query_vector,
                self.retrieval.top_k,
                self.retrieval.with_payload,
            )
            .await?;
        debug!(count = docs.len(), "retrieved documents");

        // History miss or failure degrades to an empty history.
        let history = match self.history.retrieve(user_id).await {
            Ok(history) => history,
            Err(e) => {
                warn!(user_id, error = %e, "could not retrieve chat history");
                Vec::new()
            }
        };

        // Commit the user turn before generation starts.
        if let Err(e) = self
            .history
            .save_message(user_id, ChatMessage::user(input))
            .await
        {
            warn!(user_id, error = %e, "could not save user message");
        }

        let messages = build_messages(&self.prompt, &docs, &history, input);

        let mut stream = self.generator.chat_stream(messages).await?;
        let mut assistant_buffer = String::new();

        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    // Dropping the stream aborts the generation; the
                    // partial assistant turn is discarded.
                    debug!(user_id, "chat cancelled mid-stream");
                    return Err(CorvusError::Cancelled);
                }
                next = stream.next() => match next {
                    Some(chunk) => chunk?,
                    None => break,
                },
            };

            if !chunk.done {
                assistant_buffer.push_str(&chunk.message.content);
            } else if let Err(e) = self
                .history
                .save_message(user_id, ChatMessage::assistant(assistant_buffer.clone()))
                .await
            {
                warn!(user_id, error = %e, "could not save assistant message");
            }

            on_chunk(&chunk)?;
        }

        Ok(())
    }

    /// Deletes the user's history and any transient scratch state.
    pub async fn clear_user_chat(&self, user_id: &str) -> Result<(), CorvusError> {
        self.history.clear(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    use corvus_core::ScoredPoint;
    use corvus_store::MemoryKv;
    use corvus_test_utils::{MockEmbedder, MockGenerator, RecordingVectorStore};

    fn scored(id: &str, text: &str) -> ScoredPoint {
        ScoredPoint {
            id: id.to_string(),
            score: 0.9,
            payload: HashMap::from([("text".to_string(), serde_json::json!(text))]),
        }
    }

    fn service(
        generator: Arc<MockGenerator>,
        vectors: Arc<RecordingVectorStore>,
    ) -> (ChatService, Arc<MemoryKv>) {
        let kv = Arc::new(MemoryKv::new());
        let service = ChatService::new(
            MockEmbedder::returning(vec![0.1, 0.2, 0.3]),
            generator,
            vectors,
            HistoryStore::new(kv.clone(), Duration::from_secs(3600)),
            PromptConfig {
                base_prompt: "You are helpful.".to_string(),
                ..Default::default()
            },
            RetrievalConfig {
                top_k: 2,
                with_payload: true,
            },
        );
        (service, kv)
    }

    fn history_store(kv: Arc<MemoryKv>) -> HistoryStore {
        HistoryStore::new(kv, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn streams_chunks_in_order_and_commits_history() {
        let generator = MockGenerator::streaming(vec!["Hi ", "there", "."]);
        let vectors = RecordingVectorStore::with_query_results(vec![
            scored("a", "doc one"),
            scored("b", "doc two"),
        ]);
        let (service, kv) = service(generator.clone(), vectors);

        let mut seen = Vec::new();
        service
            .process_input(&CancellationToken::new(), "u1", "Hello", |chunk| {
                seen.push((chunk.done, chunk.message.content.clone()));
                Ok(())
            })
            .await
            .unwrap();

        // Three content chunks then the terminal done chunk.
        assert_eq!(
            seen,
            vec![
                (false, "Hi ".to_string()),
                (false, "there".to_string()),
                (false, ".".to_string()),
                (true, String::new()),
            ]
        );

        let history = history_store(kv).retrieve("u1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("Hello"));
        assert_eq!(history[1], ChatMessage::assistant("Hi there."));
    }

    #[tokio::test]
    async fn retrieved_docs_and_history_flow_into_messages() {
        let generator = MockGenerator::streaming(vec!["ok"]);
        let vectors = RecordingVectorStore::with_query_results(vec![scored("a", "relevant")]);
        let (service, kv) = service(generator.clone(), vectors.clone());

        // Seed prior history.
        history_store(kv.clone())
            .save_message("u1", ChatMessage::user("earlier"))
            .await
            .unwrap();

        service
            .process_input(&CancellationToken::new(), "u1", "now", |_| Ok(()))
            .await
            .unwrap();

        // The query vector went to the vector store.
        assert_eq!(vectors.queries().await, vec![vec![0.1, 0.2, 0.3]]);

        let messages = generator.last_messages().await.unwrap();
        // base system + 1 doc + 1 history + user turn.
        assert_eq!(messages.len(), 4);
        assert!(messages[1].content.contains("relevant"));
        assert_eq!(messages[2].content, "earlier");
        assert_eq!(messages[3].content, "now");
    }

    #[tokio::test]
    async fn user_turn_commits_before_generation_fails() {
        struct FailingGenerator;

        #[async_trait::async_trait]
        impl GenerationModel for FailingGenerator {
            async fn chat_stream(
                &self,
                _messages: Vec<ChatMessage>,
            ) -> Result<corvus_core::GenerationStream, CorvusError> {
                Err(CorvusError::Internal("model down".to_string()))
            }
        }

        let kv = Arc::new(MemoryKv::new());
        let service = ChatService::new(
            MockEmbedder::returning(vec![0.1]),
            Arc::new(FailingGenerator),
            RecordingVectorStore::new(),
            HistoryStore::new(kv.clone(), Duration::from_secs(3600)),
            PromptConfig::default(),
            RetrievalConfig::default(),
        );

        let result = service
            .process_input(&CancellationToken::new(), "u1", "doomed question", |_| {
                Ok(())
            })
            .await;
        assert!(result.is_err());

        // The question was still recorded.
        let history = history_store(kv).retrieve("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0], ChatMessage::user("doomed question"));
    }

    #[tokio::test]
    async fn cancellation_drops_partial_assistant_turn() {
        let generator = MockGenerator::streaming(vec!["partial"]);
        let (service, kv) = service(generator, RecordingVectorStore::new());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = service
            .process_input(&cancel, "u1", "Hello", |_| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, CorvusError::Cancelled));

        // User turn committed in step 4 is not rolled back; no assistant turn.
        let history = history_store(kv).retrieve("u1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role, "user");
    }

    #[tokio::test]
    async fn callback_error_stops_the_stream() {
        let generator = MockGenerator::streaming(vec!["a", "b", "c"]);
        let (service, _) = service(generator, RecordingVectorStore::new());

        let mut calls = 0;
        let err = service
            .process_input(&CancellationToken::new(), "u1", "Hello", |_| {
                calls += 1;
                Err(CorvusError::Internal("client went away".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(calls, 1);
        assert!(matches!(err, CorvusError::Internal(_)));
    }

    #[tokio::test]
    async fn clear_user_chat_empties_history() {
        let generator = MockGenerator::streaming(vec!["hi"]);
        let (service, kv) = service(generator, RecordingVectorStore::new());

        service
            .process_input(&CancellationToken::new(), "u1", "Hello", |_| Ok(()))
            .await
            .unwrap();
        assert!(!history_store(kv.clone()).retrieve("u1").await.unwrap().is_empty());

        service.clear_user_chat("u1").await.unwrap();
        assert!(history_store(kv).retrieve("u1").await.unwrap().is_empty());
    }
}
