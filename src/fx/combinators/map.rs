//! Map combinators - transform every value.

use std::future::Future;
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

/// Map combinator - applies a function to every value.
///
/// Created by [`FxExt::map`](crate::FxExt::map).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(vec![1, 2, 3]).map(|n| n * 10);
/// assert_eq!(fx.collect_all().await, Ok(vec![10, 20, 30]));
/// # });
/// ```
pub struct Map<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(Map<Inner, F>);

struct MapSink<S, F> {
    sink: S,
    f: Arc<F>,
}

impl<A, B, E, S, F> Sink<A, E> for MapSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<B, E>,
    F: Fn(A) -> B + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success((self.f)(value))
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, B> Fx for Map<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Output) -> B + Send + Sync + 'static,
    B: Send + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(MapSink {
            sink,
            f: Arc::clone(&self.f),
        })
    }
}

/// MapEffect combinator - applies an async, fallible function to every
/// value.
///
/// A failing call terminates the subscription with that failure. Values are
/// processed one at a time, in order.
///
/// Created by [`FxExt::map_effect`](crate::FxExt::map_effect).
pub struct MapEffect<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(MapEffect<Inner, F>);

struct MapEffectSink<S, F> {
    sink: Arc<Terminal<S>>,
    f: Arc<F>,
}

impl<A, B, E, S, F, Fut> Sink<A, E> for MapEffectSink<S, F>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
    S: Sink<B, E>,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        match (self.f)(value).await {
            Ok(mapped) => self.sink.on_success(mapped).await,
            Err(error) => self.sink.on_failure(Cause::fail(error)).await,
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, Fut, B> Fx for MapEffect<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, Inner::Error>> + Send,
    B: Send + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = MapEffectSink {
            sink: Arc::clone(&terminal),
            f: Arc::clone(&self.f),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}
