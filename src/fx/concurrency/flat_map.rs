//! FlatMap combinator - run an inner stream per value, concurrently.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::cause::Cause;
use crate::fx::concurrency::{fork_guarded, scoped};
use crate::fx::trait_def::Fx;
use crate::schedule::Concurrency;
use crate::scope::ScopeHandle;
use crate::sink::{Sink, Terminal};

/// FlatMap combinator - maps every value to an inner stream and merges all
/// inner streams into the output.
///
/// With [`Concurrency::Bounded`], at most `n` inner streams run at a time.
/// A value arriving while all permits are taken waits for one to free up,
/// which back-pressures the upstream.
///
/// Created by [`FxExt::flat_map`](crate::FxExt::flat_map),
/// [`FxExt::flat_map_concurrently`](crate::FxExt::flat_map_concurrently) and
/// [`FxExt::flat_map_with`](crate::FxExt::flat_map_with).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(vec![1, 2])
///     .flat_map_concurrently(|n| from_iterable(vec![n, n * 10]), 1);
/// assert_eq!(fx.collect_all().await, Ok(vec![1, 10, 2, 20]));
/// # });
/// ```
pub struct FlatMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
    pub(crate) concurrency: Concurrency,
}

opaque_debug!(FlatMap<Inner, F>);

struct FlatMapSink<S, F> {
    sink: Arc<Terminal<S>>,
    scope: ScopeHandle,
    f: Arc<F>,
    permits: Option<Arc<Semaphore>>,
}

impl<A, E, S, F, X> Sink<A, E> for FlatMapSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<X::Output, E>,
    F: Fn(A) -> X + Send + Sync + 'static,
    X: Fx<Error = E>,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        let permit = match &self.permits {
            Some(permits) => match Arc::clone(permits).acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return,
            },
            None => None,
        };
        let inner = (self.f)(value);
        let sink = Arc::clone(&self.sink);
        fork_guarded::<X::Output, E, _, _>(&self.scope, &self.sink, async move {
            let _permit = permit;
            inner.run(sink).await;
        });
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, X> Fx for FlatMap<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Output) -> X + Send + Sync + 'static,
    X: Fx<Error = Inner::Error>,
{
    type Output = X::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let permits = self
            .concurrency
            .limit()
            .map(|n| Arc::new(Semaphore::new(n)));
        scoped(sink, |sink, scope| {
            self.inner.run(FlatMapSink {
                sink,
                scope,
                f: Arc::clone(&self.f),
                permits,
            })
        })
        .await
    }
}
