// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus client wrapping a raw NATS connection.
//!
//! Adds the middleware chain, trace-propagating publish/request, and
//! task-per-delivery subscription dispatch. The client is cheap to clone
//! and safe for concurrent use; all subscriptions share the connection.

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use corvus_core::{CorvusError, Envelope};

use crate::context::RequestContext;
use crate::message::{BusMessage, Handler};
use crate::middleware::{apply_middlewares, Middleware};

/// Default timeout for request/reply calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Middleware-chained NATS client.
#[derive(Clone)]
pub struct BusClient {
    client: async_nats::Client,
    middlewares: Vec<Middleware>,
    request_timeout: Duration,
}

impl BusClient {
    /// Connects to the bus at `url`.
    pub async fn connect(url: &str) -> Result<Self, CorvusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| CorvusError::bus(format!("failed to connect to {url}"), e))?;
        Ok(Self::new(client))
    }

    /// Wraps an existing connection.
    pub fn new(client: async_nats::Client) -> Self {
        Self {
            client,
            middlewares: Vec::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Appends a middleware to the chain. Registration order is
    /// preserved: the first registered runs outermost.
    pub fn with_middleware(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }

    /// Overrides the default request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The underlying connection, for direct use (e.g. JetStream).
    pub fn raw(&self) -> &async_nats::Client {
        &self.client
    }

    /// Fire-and-forget publish with the current trace injected into headers.
    ///
    /// Returns after the connection has accepted the frame.
    pub async fn publish(
        &self,
        ctx: &RequestContext,
        subject: &str,
        payload: Bytes,
    ) -> Result<(), CorvusError> {
        let mut headers = async_nats::HeaderMap::new();
        ctx.trace.inject(&mut headers);

        self.client
            .publish_with_headers(subject.to_string(), headers, payload)
            .await
            .map_err(|e| CorvusError::bus(format!("failed to publish on {subject}"), e))?;
        self.client
            .flush()
            .await
            .map_err(|e| CorvusError::bus("failed to flush publish", e))
    }

    /// Serializes `value` and publishes it.
    pub async fn publish_json<T: Serialize>(
        &self,
        ctx: &RequestContext,
        subject: &str,
        value: &T,
    ) -> Result<(), CorvusError> {
        let payload = serde_json::to_vec(value)?;
        self.publish(ctx, subject, payload.into()).await
    }

    /// Request/reply with trace propagation and deadline handling.
    ///
    /// Uses the smaller of the context's remaining deadline and the
    /// configured default timeout. The reply's context is re-populated
    /// from the reply headers.
    pub async fn request(
        &self,
        ctx: &RequestContext,
        subject: &str,
        payload: Bytes,
    ) -> Result<BusMessage, CorvusError> {
        let mut headers = async_nats::HeaderMap::new();
        ctx.trace.inject(&mut headers);

        let timeout = match ctx.remaining() {
            Some(remaining) => remaining.min(self.request_timeout),
            None => self.request_timeout,
        };

        let request = async_nats::Request::new()
            .payload(payload)
            .headers(headers);

        let send = self.client.send_request(subject.to_string(), request);

        let response = tokio::select! {
            result = tokio::time::timeout(timeout, send) => match result {
                Err(_) => return Err(CorvusError::Timeout { duration: timeout }),
                Ok(Err(e)) => return Err(map_request_error(subject, e)),
                Ok(Ok(msg)) => msg,
            },
            _ = ctx.cancellation.cancelled() => return Err(CorvusError::Cancelled),
        };

        debug!(subject = %subject, "bus request completed");
        Ok(BusMessage::from_delivery(response, self.client.clone()))
    }

    /// Request/reply over typed JSON bodies with the universal envelope.
    pub async fn request_json<Req, Resp>(
        &self,
        ctx: &RequestContext,
        subject: &str,
        body: &Req,
    ) -> Result<Resp, CorvusError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let reply = self.request(ctx, subject, payload.into()).await?;
        let envelope: Envelope<Resp> = reply.decode()?;
        envelope.into_result()
    }

    /// Subscribes `handler` to every message on `subject`.
    ///
    /// Each delivery runs the full middleware chain in its own task;
    /// handler errors are logged and never stop the dispatcher. The
    /// returned handle owns the dispatch loop.
    pub async fn subscribe(
        &self,
        subject: &str,
        handler: Handler,
    ) -> Result<JoinHandle<()>, CorvusError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| CorvusError::bus(format!("failed to subscribe to {subject}"), e))?;
        Ok(self.spawn_dispatch(subject, subscriber, handler))
    }

    /// Load-balanced subscription: at most one member of `group`
    /// processes each message.
    pub async fn queue_subscribe(
        &self,
        subject: &str,
        group: &str,
        handler: Handler,
    ) -> Result<JoinHandle<()>, CorvusError> {
        let subscriber = self
            .client
            .queue_subscribe(subject.to_string(), group.to_string())
            .await
            .map_err(|e| {
                CorvusError::bus(format!("failed to queue-subscribe to {subject}"), e)
            })?;
        Ok(self.spawn_dispatch(subject, subscriber, handler))
    }

    fn spawn_dispatch(
        &self,
        subject: &str,
        mut subscriber: async_nats::Subscriber,
        handler: Handler,
    ) -> JoinHandle<()> {
        let chained = apply_middlewares(&self.middlewares, handler);
        let client = self.client.clone();
        let subject = subject.to_string();

        tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                let chained = chained.clone();
                let client = client.clone();
                let subject = subject.clone();
                tokio::spawn(async move {
                    let bus_msg = BusMessage::from_delivery(msg, client);
                    if let Err(e) = chained(bus_msg).await {
                        error!(subject = %subject, error = %e, "handler error");
                    }
                });
            }
            debug!(subject = %subject, "subscription closed");
        })
    }
}

fn map_request_error(subject: &str, err: async_nats::RequestError) -> CorvusError {
    match err.kind() {
        async_nats::RequestErrorKind::NoResponders => CorvusError::NoResponders {
            subject: subject.to_string(),
        },
        async_nats::RequestErrorKind::TimedOut => CorvusError::Timeout {
            duration: DEFAULT_REQUEST_TIMEOUT,
        },
        _ => CorvusError::bus(format!("request on {subject} failed"), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn request_honors_context_deadline_over_default() {
        // A context whose deadline already passed must not wait the full
        // default timeout; we only check the arithmetic here.
        let mut ctx = RequestContext::new_root();
        ctx.deadline = Some(std::time::Instant::now());
        let remaining = ctx.remaining().unwrap();
        assert!(remaining.min(DEFAULT_REQUEST_TIMEOUT) <= Duration::from_millis(1));
    }
}
