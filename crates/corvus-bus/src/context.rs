// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit request context threaded through bus handlers.
//!
//! Carries cancellation, an optional deadline, the propagated trace
//! context, and metadata bound from headers. Replaces the ambient
//! context the transport would otherwise hide.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::trace::TraceContext;

/// Per-delivery context handed to every handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Cancellation signal; cancelled on shutdown or caller abort.
    pub cancellation: CancellationToken,
    /// Absolute deadline set by the timeout middleware, if any.
    pub deadline: Option<Instant>,
    /// Propagated distributed-trace identifiers.
    pub trace: TraceContext,
    /// Metadata bound from headers by the metadata-extract middleware.
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Fresh root context with a new trace.
    pub fn new_root() -> Self {
        Self::with_trace(TraceContext::new_root())
    }

    /// Context around an extracted (or minted) trace.
    pub fn with_trace(trace: TraceContext) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: None,
            trace,
            metadata: HashMap::new(),
        }
    }

    /// Derives a child context: child trace span, child cancellation token.
    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
            trace: self.trace.child(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Time left before the deadline; `None` when no deadline is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new_root()
    }
}
