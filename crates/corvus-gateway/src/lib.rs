// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway: the platform's HTTP front door.
//!
//! Validates requests, translates them into bus RPCs with trace
//! propagation, maps envelope errors onto HTTP statuses, and enforces a
//! per-process rate limit.

pub mod connector;
pub mod error;
pub mod ratelimit;
pub mod server;

pub use connector::{AuthConnector, DocumentConnector};
pub use ratelimit::RateLimiter;
pub use server::{router, serve, GatewayState};
