// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bus client for the Corvus platform.
//!
//! Wraps a raw NATS connection with a composable middleware chain,
//! request/reply helpers, queue-group load balancing, and distributed
//! trace propagation carried in message headers. Trace context is an
//! explicit value on every message -- nothing flows through thread-locals.

pub mod client;
pub mod context;
pub mod message;
pub mod middleware;
pub mod subjects;
pub mod trace;

pub use client::BusClient;
pub use context::RequestContext;
pub use message::{handler_fn, BusMessage, Handler};
pub use middleware::{
    apply_middlewares, logging, metadata_extract, rate_limit, recover, retry, timeout, Middleware,
};
pub use trace::{HeaderCarrier, TraceContext, TRACEPARENT_HEADER};
