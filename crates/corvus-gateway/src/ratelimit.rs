// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-process token-bucket rate limiter.
//!
//! The bucket holds one second's worth of permits and refills
//! continuously; once sustained traffic exceeds the configured
//! requests-per-second the middleware answers 429.

use std::sync::Arc;
use std::time::Instant;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::sync::Mutex;

use crate::error::ErrorBody;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket shared across all routes of one process.
#[derive(Clone)]
pub struct RateLimiter {
    rps: f64,
    bucket: Arc<Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(rps: u32) -> Self {
        let rps = f64::from(rps.max(1));
        Self {
            rps,
            bucket: Arc::new(Mutex::new(Bucket {
                tokens: rps,
                last_refill: Instant::now(),
            })),
        }
    }

    /// Takes one permit if available.
    pub async fn try_acquire(&self) -> bool {
        let mut bucket = self.bucket.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.rps);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// The 429 response returned when the bucket is empty.
    pub fn rejection() -> Response {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ErrorBody {
                error: "rate_limited".to_string(),
                message: "too many requests".to_string(),
                details: None,
            }),
        )
            .into_response()
    }
}
