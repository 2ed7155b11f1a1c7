// SPDX-FileCopyrightText: 2026 Corvus Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Built-in handler middlewares.
//!
//! A middleware wraps a [`Handler`] into a new one. The chain composes in
//! reverse registration order, so the first-registered middleware runs
//! outermost. The recommended outer-to-inner order is recover, logging,
//! timeout, retry.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error, warn};

use corvus_core::CorvusError;

use crate::message::{BusMessage, Handler};
use crate::trace::HeaderCarrier;

/// A middleware: `next -> handler`.
pub type Middleware = Arc<dyn Fn(Handler) -> Handler + Send + Sync>;

/// Composes the registered middlewares around `handler`.
///
/// Applied in reverse order so `middlewares[0]` runs outermost.
pub fn apply_middlewares(middlewares: &[Middleware], mut handler: Handler) -> Handler {
    for mw in middlewares.iter().rev() {
        handler = mw(handler);
    }
    handler
}

/// Records delivery, duration, and outcome of every handler run.
pub fn logging() -> Middleware {
    Arc::new(|next: Handler| {
        Arc::new(move |msg: BusMessage| {
            let next = next.clone();
            Box::pin(async move {
                let subject = msg.subject.clone();
                debug!(
                    subject = %subject,
                    reply = msg.reply.as_deref().unwrap_or(""),
                    size = msg.payload.len(),
                    "bus message received"
                );

                let start = Instant::now();
                let result = next(msg).await;
                let duration = start.elapsed();

                match &result {
                    Ok(()) => {
                        debug!(subject = %subject, duration_ms = duration.as_millis() as u64, "bus handler completed");
                    }
                    Err(e) => {
                        error!(
                            subject = %subject,
                            duration_ms = duration.as_millis() as u64,
                            error = %e,
                            "bus handler failed"
                        );
                    }
                }

                result
            })
        })
    })
}

/// Catches panics from the handler and promotes them to an error value.
///
/// Keeps a panicking handler from taking down the dispatcher task.
pub fn recover() -> Middleware {
    Arc::new(|next: Handler| {
        Arc::new(move |msg: BusMessage| {
            let next = next.clone();
            Box::pin(async move {
                let subject = msg.subject.clone();
                match AssertUnwindSafe(next(msg)).catch_unwind().await {
                    Ok(result) => result,
                    Err(panic) => {
                        let summary = panic_summary(&panic);
                        error!(subject = %subject, panic = %summary, "panic in bus handler");
                        Err(CorvusError::PanicRecovered(summary))
                    }
                }
            })
        })
    })
}

fn panic_summary(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Bounds handler execution time.
///
/// The handler runs in a separately-scheduled task; on expiry this
/// middleware returns `timeout_exceeded` without waiting for it. The
/// message's context gets the deadline so suspension points downstream
/// can observe it.
pub fn timeout(duration: Duration) -> Middleware {
    Arc::new(move |next: Handler| {
        Arc::new(move |mut msg: BusMessage| {
            let next = next.clone();
            Box::pin(async move {
                msg.context.deadline = Some(Instant::now() + duration);
                let cancellation = msg.context.cancellation.clone();

                let (tx, rx) = oneshot::channel();
                tokio::spawn(async move {
                    let _ = tx.send(next(msg).await);
                });

                tokio::select! {
                    result = rx => {
                        result.unwrap_or_else(|_| {
                            Err(CorvusError::Internal("handler task dropped its result".to_string()))
                        })
                    }
                    _ = tokio::time::sleep(duration) => {
                        Err(CorvusError::Timeout { duration })
                    }
                    _ = cancellation.cancelled() => Err(CorvusError::Cancelled),
                }
            })
        })
    })
}

/// Re-invokes the handler on error, up to `max_retries` additional times.
///
/// Delay grows linearly: `base_delay * attempt`. The final error wraps
/// the last underlying error with the retry count.
pub fn retry(max_retries: u32, base_delay: Duration) -> Middleware {
    Arc::new(move |next: Handler| {
        Arc::new(move |msg: BusMessage| {
            let next = next.clone();
            Box::pin(async move {
                let mut last_err = None;

                for attempt in 0..=max_retries {
                    match next(msg.clone()).await {
                        Ok(()) => return Ok(()),
                        Err(e) => {
                            if attempt < max_retries {
                                warn!(
                                    subject = %msg.subject,
                                    attempt = attempt + 1,
                                    max_retries,
                                    error = %e,
                                    "handler failed, retrying"
                                );
                                tokio::time::sleep(base_delay * (attempt + 1)).await;
                            }
                            last_err = Some(e);
                        }
                    }
                }

                let last = last_err.expect("at least one attempt ran");
                Err(CorvusError::Bus {
                    message: format!("handler failed after {max_retries} retries"),
                    source: Some(Box::new(last)),
                })
            })
        })
    })
}

/// Gates handler entry through a shared ticker at `per_second` deliveries.
///
/// A cancelled context returns immediately with `cancelled` instead of
/// queueing behind the ticker.
pub fn rate_limit(per_second: u32) -> Middleware {
    let period = Duration::from_secs(1) / per_second.max(1);
    let ticker = Arc::new(Mutex::new(tokio::time::interval(period)));

    Arc::new(move |next: Handler| {
        let ticker = ticker.clone();
        Arc::new(move |msg: BusMessage| {
            let next = next.clone();
            let ticker = ticker.clone();
            Box::pin(async move {
                let cancellation = msg.context.cancellation.clone();
                {
                    let mut ticker = ticker.lock().await;
                    tokio::select! {
                        _ = ticker.tick() => {}
                        _ = cancellation.cancelled() => return Err(CorvusError::Cancelled),
                    }
                }
                next(msg).await
            })
        })
    })
}

/// Binds selected header values into the handler context metadata map.
pub fn metadata_extract(keys: Vec<String>) -> Middleware {
    let keys = Arc::new(keys);
    Arc::new(move |next: Handler| {
        let keys = keys.clone();
        Arc::new(move |mut msg: BusMessage| {
            let next = next.clone();
            let keys = keys.clone();
            Box::pin(async move {
                for key in keys.iter() {
                    if let Some(value) = HeaderCarrier::get(&msg.headers, key) {
                        msg.context.metadata.insert(key.clone(), value);
                    }
                }
                next(msg).await
            })
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::message::handler_fn;

    fn test_msg() -> BusMessage {
        BusMessage::local("test.subject", Vec::new())
    }

    #[tokio::test]
    async fn chain_applies_first_registered_outermost() {
        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));

        let tag = |name: &'static str, order: Arc<Mutex<Vec<&'static str>>>| -> Middleware {
            Arc::new(move |next: Handler| {
                let order = order.clone();
                Arc::new(move |msg| {
                    let next = next.clone();
                    let order = order.clone();
                    Box::pin(async move {
                        order.lock().await.push(name);
                        next(msg).await
                    })
                })
            })
        };

        let middlewares = vec![tag("outer", order.clone()), tag("inner", order.clone())];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(|_msg| async { Ok(()) }),
        );

        handler(test_msg()).await.unwrap();
        assert_eq!(*order.lock().await, vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn recover_converts_panic_to_error() {
        let middlewares = vec![recover()];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(|_msg| async { panic!("boom in handler") }),
        );

        let err = handler(test_msg()).await.unwrap_err();
        match err {
            CorvusError::PanicRecovered(summary) => {
                assert!(summary.contains("boom in handler"));
            }
            other => panic!("expected PanicRecovered, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn recover_passes_through_success() {
        let middlewares = vec![recover()];
        let handler = apply_middlewares(&middlewares, handler_fn(|_msg| async { Ok(()) }));
        assert!(handler(test_msg()).await.is_ok());
    }

    #[tokio::test]
    async fn timeout_returns_without_waiting_for_handler() {
        let middlewares = vec![timeout(Duration::from_millis(20))];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(|_msg| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            }),
        );

        let start = Instant::now();
        let err = handler(test_msg()).await.unwrap_err();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(err.code(), "timeout_exceeded");
    }

    #[tokio::test]
    async fn timeout_sets_deadline_on_context() {
        let middlewares = vec![timeout(Duration::from_secs(5))];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(|msg: BusMessage| async move {
                assert!(msg.context.deadline.is_some());
                assert!(msg.context.remaining().unwrap() <= Duration::from_secs(5));
                Ok(())
            }),
        );
        handler(test_msg()).await.unwrap();
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let middlewares = vec![retry(3, Duration::from_millis(1))];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(move |_msg| {
                let attempts = attempts_clone.clone();
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(CorvusError::Internal("transient".to_string()))
                    } else {
                        Ok(())
                    }
                }
            }),
        );

        handler(test_msg()).await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_exhaustion_wraps_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let middlewares = vec![retry(2, Duration::from_millis(1))];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(move |_msg| {
                let attempts = attempts_clone.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err(CorvusError::Internal("always fails".to_string()))
                }
            }),
        );

        let err = handler(test_msg()).await.unwrap_err();
        // 1 initial + 2 retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        match err {
            CorvusError::Bus { message, source } => {
                assert!(message.contains("after 2 retries"));
                assert!(source.unwrap().to_string().contains("always fails"));
            }
            other => panic!("expected Bus wrap, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_cancelled_context_returns_immediately() {
        // One permit per minute: the first delivery consumes the immediate
        // tick, the second would block until cancellation.
        let middlewares = vec![rate_limit(1) /* 1/s */];
        let handler = apply_middlewares(&middlewares, handler_fn(|_msg| async { Ok(()) }));

        handler(test_msg()).await.unwrap();

        let msg = test_msg();
        msg.context.cancellation.cancel();
        let err = handler(msg).await.unwrap_err();
        assert_eq!(err.code(), "cancelled");
    }

    #[tokio::test]
    async fn metadata_extract_binds_configured_headers() {
        let middlewares = vec![metadata_extract(vec![
            "X-Request-Id".to_string(),
            "X-User-Id".to_string(),
        ])];
        let handler = apply_middlewares(
            &middlewares,
            handler_fn(|msg: BusMessage| async move {
                assert_eq!(
                    msg.context.metadata.get("X-Request-Id").map(String::as_str),
                    Some("req-42")
                );
                assert!(!msg.context.metadata.contains_key("X-User-Id"));
                Ok(())
            }),
        );

        let mut msg = test_msg();
        msg.headers.insert("X-Request-Id", "req-42");
        msg.headers.insert("X-Unrelated", "ignored");
        handler(msg).await.unwrap();
    }
}
