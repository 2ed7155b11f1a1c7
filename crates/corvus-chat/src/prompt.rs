// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Working-context assembly for generation.
//!
//! The message array is `[system: base_prompt]`, one system message per
//! retrieved document, the prior history, and finally the prepared user
//! turn (`context_prompt || query_prompt || query`).

use std::collections::HashMap;

use tracing::warn;

use corvus_core::{ChatMessage, ScoredPoint};

/// Payload key holding a retrieved chunk's text.
const TEXT_KEY: &str = "text";

/// Prompt templates around the user's query.
#[derive(Debug, Clone, Default)]
pub struct PromptConfig {
    /// System prompt opening every conversation.
    pub base_prompt: String,
    /// Prefix introducing the retrieved-context block in the user turn.
    pub context_prompt: String,
    /// Prefix introducing the raw query in the user turn.
    pub query_prompt: String,
}

/// Renders one retrieved point as a context document block.
///
/// Returns `None` when the payload carries no text, so the caller can
/// skip it with a warning.
pub fn render_context_doc(point: &ScoredPoint) -> Option<String> {
    let text = point.payload.get(TEXT_KEY).and_then(|v| v.as_str())?;

    let mut block = String::with_capacity(text.len() + 64);
    block.push_str("Context document:\n");

    let mut keys: Vec<&String> = point
        .payload
        .keys()
        .filter(|k| k.as_str() != TEXT_KEY)
        .collect();
    keys.sort();
    for key in keys {
        let value = &point.payload[key];
        let rendered = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
        block.push_str(&format!("{key}: {rendered}\n"));
    }

    block.push_str("Content:\n");
    block.push_str(text);
    Some(block)
}

/// The prepared user turn: context prompt, query prompt, then the query.
pub fn prepare_user_turn(config: &PromptConfig, query: &str) -> String {
    let mut turn = String::new();
    if !config.context_prompt.is_empty() {
        turn.push_str(&config.context_prompt);
        turn.push('\n');
    }
    if !config.query_prompt.is_empty() {
        turn.push_str(&config.query_prompt);
        turn.push('\n');
    }
    turn.push_str(query);
    turn
}

/// Assembles the full message array for one generation call.
pub fn build_messages(
    config: &PromptConfig,
    docs: &[ScoredPoint],
    history: &[ChatMessage],
    query: &str,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(docs.len() + history.len() + 2);
    messages.push(ChatMessage::system(config.base_prompt.clone()));

    for doc in docs {
        match render_context_doc(doc) {
            Some(block) => messages.push(ChatMessage::system(block)),
            None => warn!(doc_id = %doc.id, "retrieved document without text payload"),
        }
    }

    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(prepare_user_turn(config, query)));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(payload: &[(&str, serde_json::Value)]) -> ScoredPoint {
        ScoredPoint {
            id: "p1".to_string(),
            score: 0.9,
            payload: payload
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn render_includes_metadata_and_content() {
        let p = point(&[
            ("text", serde_json::json!("chunk body")),
            ("document_id", serde_json::json!("doc-1")),
            ("ordinal", serde_json::json!(2)),
        ]);
        let block = render_context_doc(&p).unwrap();
        assert!(block.starts_with("Context document:\n"));
        assert!(block.contains("document_id: doc-1\n"));
        assert!(block.contains("ordinal: 2\n"));
        assert!(block.ends_with("Content:\nchunk body"));
    }

    #[test]
    fn render_without_text_is_none() {
        let p = point(&[("document_id", serde_json::json!("doc-1"))]);
        assert!(render_context_doc(&p).is_none());
    }

    #[test]
    fn prepare_user_turn_concatenates_prompts() {
        let config = PromptConfig {
            base_prompt: "base".to_string(),
            context_prompt: "Use the context above.".to_string(),
            query_prompt: "Question:".to_string(),
        };
        let turn = prepare_user_turn(&config, "What is Corvus?");
        assert_eq!(turn, "Use the context above.\nQuestion:\nWhat is Corvus?");
    }

    #[test]
    fn prepare_user_turn_with_empty_prompts_is_the_query() {
        let config = PromptConfig::default();
        assert_eq!(prepare_user_turn(&config, "raw query"), "raw query");
    }

    #[test]
    fn build_messages_orders_sections() {
        let config = PromptConfig {
            base_prompt: "You are helpful.".to_string(),
            ..Default::default()
        };
        let docs = vec![
            point(&[("text", serde_json::json!("first doc"))]),
            point(&[("no_text", serde_json::json!(true))]), // skipped
            point(&[("text", serde_json::json!("second doc"))]),
        ];
        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];

        let messages = build_messages(&config, &docs, &history, "new question");

        // system base, 2 doc systems, 2 history, 1 user turn.
        assert_eq!(messages.len(), 6);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "You are helpful.");
        assert!(messages[1].content.contains("first doc"));
        assert!(messages[2].content.contains("second doc"));
        assert_eq!(messages[3].content, "earlier question");
        assert_eq!(messages[4].content, "earlier answer");
        assert_eq!(messages[5].role, "user");
        assert_eq!(messages[5].content, "new question");
    }
}
