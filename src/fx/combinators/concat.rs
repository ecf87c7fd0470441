//! Sequential composition.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::Sink;

/// StartWith combinator - emits a value before subscribing upstream.
///
/// Created by [`FxExt::start_with`](crate::FxExt::start_with).
#[derive(Debug)]
pub struct StartWith<Inner, A> {
    pub(crate) inner: Inner,
    pub(crate) value: A,
}

impl<Inner> Fx for StartWith<Inner, Inner::Output>
where
    Inner: Fx,
    Inner::Output: Clone + Sync,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        sink.on_success(self.value.clone()).await;
        self.inner.run(sink).await
    }
}

/// ContinueWith combinator - subscribes to a second stream once the first
/// completes without failing.
///
/// Created by [`FxExt::continue_with`](crate::FxExt::continue_with).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(vec![1, 2]).continue_with(from_iterable(vec![3]));
/// assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
/// # });
/// ```
#[derive(Debug)]
pub struct ContinueWith<First, Second> {
    pub(crate) first: First,
    pub(crate) second: Second,
}

struct FirstSink<S> {
    sink: Arc<S>,
    failed: Arc<AtomicBool>,
}

impl<A, E, S> Sink<A, E> for FirstSink<S>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.failed.store(true, Ordering::SeqCst);
        self.sink.on_failure(cause)
    }
}

impl<First, Second> Fx for ContinueWith<First, Second>
where
    First: Fx,
    Second: Fx<Output = First::Output, Error = First::Error>,
{
    type Output = First::Output;
    type Error = First::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let sink = Arc::new(sink);
        let failed = Arc::new(AtomicBool::new(false));
        self.first
            .run(FirstSink {
                sink: Arc::clone(&sink),
                failed: Arc::clone(&failed),
            })
            .await;
        if !failed.load(Ordering::SeqCst) {
            self.second.run(sink).await
        }
    }
}
