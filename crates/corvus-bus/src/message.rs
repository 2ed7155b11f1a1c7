// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message wrapper and handler types for bus subscriptions.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use corvus_core::{CorvusError, Envelope};

use crate::context::RequestContext;
use crate::trace::TraceContext;

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), CorvusError>> + Send>>;

/// A subscription handler: `(message) -> error`.
///
/// Handlers are cheap to clone and shared across deliveries; each delivery
/// runs in its own task.
pub type Handler = Arc<dyn Fn(BusMessage) -> HandlerFuture + Send + Sync>;

/// Adapts an async closure into a [`Handler`].
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(BusMessage) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), CorvusError>> + Send + 'static,
{
    Arc::new(move |msg| Box::pin(f(msg)))
}

/// A delivered bus message plus its explicit request context.
#[derive(Clone)]
pub struct BusMessage {
    pub subject: String,
    /// Reply subject for request/reply deliveries.
    pub reply: Option<String>,
    pub headers: async_nats::HeaderMap,
    pub payload: Bytes,
    pub context: RequestContext,
    /// Connection used for replying; absent for locally built messages.
    client: Option<async_nats::Client>,
}

impl BusMessage {
    /// Wraps a raw delivery, extracting trace context from headers.
    pub fn from_delivery(msg: async_nats::Message, client: async_nats::Client) -> Self {
        let headers = msg.headers.unwrap_or_default();
        let trace = TraceContext::extract(&headers).unwrap_or_else(TraceContext::new_root);
        Self {
            subject: msg.subject.to_string(),
            reply: msg.reply.map(|r| r.to_string()),
            headers,
            payload: msg.payload,
            context: RequestContext::with_trace(trace),
            client: None,
        }
        .with_client(client)
    }

    /// Builds a message without a connection, for in-process dispatch
    /// and middleware tests.
    pub fn local(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            headers: async_nats::HeaderMap::new(),
            payload: payload.into(),
            context: RequestContext::new_root(),
            client: None,
        }
    }

    fn with_client(mut self, client: async_nats::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Deserializes the payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CorvusError> {
        serde_json::from_slice(&self.payload).map_err(CorvusError::from)
    }

    /// Serializes `value` and publishes it on the reply subject.
    ///
    /// The reply carries the current trace context in its headers so the
    /// requester can re-populate its context from them.
    pub async fn respond_json<T: Serialize>(&self, value: &T) -> Result<(), CorvusError> {
        let reply = self.reply.clone().ok_or_else(|| CorvusError::Bus {
            message: format!("message on {} has no reply subject", self.subject),
            source: None,
        })?;
        let client = self.client.as_ref().ok_or_else(|| CorvusError::Bus {
            message: "message is not attached to a connection".to_string(),
            source: None,
        })?;

        let payload = serde_json::to_vec(value)?;
        let mut headers = async_nats::HeaderMap::new();
        self.context.trace.inject(&mut headers);

        client
            .publish_with_headers(reply, headers, payload.into())
            .await
            .map_err(|e| CorvusError::bus("failed to publish reply", e))
    }

    /// Replies with a success envelope around `data`.
    pub async fn respond_ok<T: Serialize>(&self, data: T) -> Result<(), CorvusError> {
        self.respond_json(&Envelope::ok(data)).await
    }

    /// Replies with a failure envelope carrying the error's wire code.
    pub async fn respond_err(&self, err: &CorvusError) -> Result<(), CorvusError> {
        self.respond_json(&Envelope::<()>::err(err)).await
    }
}

impl std::fmt::Debug for BusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusMessage")
            .field("subject", &self.subject)
            .field("reply", &self.reply)
            .field("payload_len", &self.payload.len())
            .field("trace_id", &self.context.trace.trace_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        seq: u32,
    }

    #[test]
    fn decode_valid_payload() {
        let msg = BusMessage::local("test.subject", r#"{"seq": 7}"#.as_bytes().to_vec());
        let ping: Ping = msg.decode().unwrap();
        assert_eq!(ping, Ping { seq: 7 });
    }

    #[test]
    fn decode_invalid_payload_is_serialization_error() {
        let msg = BusMessage::local("test.subject", "not json".as_bytes().to_vec());
        let err = msg.decode::<Ping>().unwrap_err();
        assert_eq!(err.code(), "serialization_error");
    }

    #[tokio::test]
    async fn respond_without_reply_subject_fails() {
        let msg = BusMessage::local("test.subject", Vec::new());
        let err = msg.respond_ok(1u32).await.unwrap_err();
        assert_eq!(err.code(), "bus_error");
    }

    #[test]
    fn handler_fn_wraps_closures() {
        let handler = handler_fn(|_msg| async { Ok(()) });
        // A second clone must reference the same underlying closure.
        let clone = handler.clone();
        assert_eq!(Arc::strong_count(&handler), 2);
        drop(clone);
    }
}
