//! Retry combinator - re-subscribe after a typed failure.

use std::sync::{Arc, Mutex};

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::schedule::Schedule;
use crate::scope::lock;
use crate::sink::Sink;

/// Retry combinator - re-runs the upstream after a typed failure, waiting
/// between attempts as the [`Schedule`] dictates.
///
/// Only typed failures are retried; a defect or an interruption is
/// forwarded at once. Values emitted by a failed attempt have already been
/// delivered and are not taken back. When the schedule is exhausted the
/// last failure is forwarded.
///
/// Created by [`FxExt::retry`](crate::FxExt::retry).
///
/// ```rust
/// use undertow::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let attempts = Arc::new(AtomicUsize::new(0));
/// let counter = attempts.clone();
/// let fx = from_effect(move || {
///     let n = counter.fetch_add(1, Ordering::SeqCst);
///     async move { if n < 2 { Err("flaky") } else { Ok(n) } }
/// })
/// .retry(Schedule::spaced(Duration::from_millis(1)).with_max_recurrences(5));
///
/// assert_eq!(fx.collect_all().await, Ok(vec![2]));
/// assert_eq!(attempts.load(Ordering::SeqCst), 3);
/// # });
/// ```
#[derive(Debug)]
pub struct Retry<Inner> {
    pub(crate) inner: Inner,
    pub(crate) schedule: Schedule,
}

struct AttemptSink<S, E> {
    sink: Arc<S>,
    failure: Arc<Mutex<Option<Cause<E>>>>,
}

impl<A, E, S> Sink<A, E> for AttemptSink<S, E>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    async fn on_success(&self, value: A) {
        self.sink.on_success(value).await
    }

    async fn on_failure(&self, cause: Cause<E>) {
        lock(&self.failure).get_or_insert(cause);
    }
}

fn retryable<E>(cause: &Cause<E>) -> bool {
    cause.is_failure() && !cause.is_die() && !cause.is_interrupted()
}

impl<Inner: Fx> Fx for Retry<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let sink = Arc::new(sink);
        let mut attempt = 0u32;
        loop {
            let failure = Arc::new(Mutex::new(None));
            self.inner
                .run(AttemptSink {
                    sink: Arc::clone(&sink),
                    failure: Arc::clone(&failure),
                })
                .await;
            let failure = lock(&failure).take();
            let Some(cause) = failure else {
                return;
            };
            let delay = if retryable(&cause) {
                self.schedule.jittered_delay_for(attempt)
            } else {
                None
            };
            match delay {
                Some(delay) => {
                    tracing::debug!(attempt, ?delay, "retry: re-subscribing after failure");
                    tokio::time::sleep(delay).await;
                    attempt = attempt.saturating_add(1);
                }
                None => return sink.on_failure(cause).await,
            }
        }
    }
}
