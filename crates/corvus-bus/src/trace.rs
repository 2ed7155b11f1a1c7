// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! W3C trace-context propagation over message headers.
//!
//! Trace identifiers travel in the standard `traceparent` header
//! (`00-{trace_id}-{span_id}-{flags}`). Injection happens on every publish
//! and request; extraction happens exactly once, at subscription delivery.

use rand::RngCore;

/// Header key carrying the serialized trace context.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Read/write access to a message's headers, decoupled from the transport.
pub trait HeaderCarrier {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn keys(&self) -> Vec<String>;
}

impl HeaderCarrier for async_nats::HeaderMap {
    fn get(&self, key: &str) -> Option<String> {
        async_nats::HeaderMap::get(self, key).map(|v| v.as_str().to_string())
    }

    fn set(&mut self, key: &str, value: &str) {
        self.insert(key, value);
    }

    fn keys(&self) -> Vec<String> {
        self.iter().map(|(name, _)| name.to_string()).collect()
    }
}

/// Distributed trace identifiers for one unit of work.
///
/// `trace_id` is stable across the whole request tree; each hop gets a
/// fresh `span_id` via [`TraceContext::child`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    /// 32 lowercase hex characters, never all zero.
    pub trace_id: String,
    /// 16 lowercase hex characters, never all zero.
    pub span_id: String,
    /// Trace flags byte (01 = sampled).
    pub flags: u8,
}

impl TraceContext {
    /// Starts a fresh root trace with random identifiers.
    pub fn new_root() -> Self {
        let mut rng = rand::thread_rng();
        let mut trace_bytes = [0u8; 16];
        let mut span_bytes = [0u8; 8];
        rng.fill_bytes(&mut trace_bytes);
        rng.fill_bytes(&mut span_bytes);
        Self {
            trace_id: hex_encode(&trace_bytes),
            span_id: hex_encode(&span_bytes),
            flags: 0x01,
        }
    }

    /// Derives a child context: same trace, new span.
    pub fn child(&self) -> Self {
        let mut span_bytes = [0u8; 8];
        rand::thread_rng().fill_bytes(&mut span_bytes);
        Self {
            trace_id: self.trace_id.clone(),
            span_id: hex_encode(&span_bytes),
            flags: self.flags,
        }
    }

    /// Serializes to the `traceparent` wire format.
    pub fn to_traceparent(&self) -> String {
        format!("00-{}-{}-{:02x}", self.trace_id, self.span_id, self.flags)
    }

    /// Parses a `traceparent` value; `None` on any malformation.
    pub fn from_traceparent(value: &str) -> Option<Self> {
        let mut parts = value.split('-');
        let version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        let flags = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        if version != "00" || trace_id.len() != 32 || span_id.len() != 16 || flags.len() != 2 {
            return None;
        }
        if !is_lower_hex(trace_id) || !is_lower_hex(span_id) {
            return None;
        }
        // All-zero ids are invalid traceparent values.
        if trace_id.bytes().all(|b| b == b'0') || span_id.bytes().all(|b| b == b'0') {
            return None;
        }
        let flags = u8::from_str_radix(flags, 16).ok()?;
        Some(Self {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            flags,
        })
    }

    /// Writes this context into the carrier's headers.
    pub fn inject(&self, carrier: &mut dyn HeaderCarrier) {
        carrier.set(TRACEPARENT_HEADER, &self.to_traceparent());
    }

    /// Reads a context out of the carrier's headers, if present and valid.
    pub fn extract(carrier: &dyn HeaderCarrier) -> Option<Self> {
        carrier
            .get(TRACEPARENT_HEADER)
            .and_then(|v| Self::from_traceparent(&v))
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

fn is_lower_hex(s: &str) -> bool {
    s.bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
