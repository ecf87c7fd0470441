//! Filter combinators - keep some values, drop the rest.

use std::future::Future;
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

/// Filter combinator - keeps values matching a predicate.
///
/// Created by [`FxExt::filter`](crate::FxExt::filter).
pub struct Filter<Inner, P> {
    pub(crate) inner: Inner,
    pub(crate) predicate: Arc<P>,
}

opaque_debug!(Filter<Inner, P>);

struct FilterSink<S, P> {
    sink: S,
    predicate: Arc<P>,
}

impl<A, E, S, P> Sink<A, E> for FilterSink<S, P>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    async fn on_success(&self, value: A) {
        if (self.predicate)(&value) {
            self.sink.on_success(value).await;
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, P> Fx for Filter<Inner, P>
where
    Inner: Fx,
    P: Fn(&Inner::Output) -> bool + Send + Sync + 'static,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(FilterSink {
            sink,
            predicate: Arc::clone(&self.predicate),
        })
    }
}

/// FilterMap combinator - maps values and keeps the `Some` results.
///
/// Created by [`FxExt::filter_map`](crate::FxExt::filter_map).
pub struct FilterMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(FilterMap<Inner, F>);

struct FilterMapSink<S, F> {
    sink: S,
    f: Arc<F>,
}

impl<A, B, E, S, F> Sink<A, E> for FilterMapSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    B: Send,
    S: Sink<B, E>,
    F: Fn(A) -> Option<B> + Send + Sync + 'static,
{
    async fn on_success(&self, value: A) {
        if let Some(mapped) = (self.f)(value) {
            self.sink.on_success(mapped).await;
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, B> Fx for FilterMap<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Output) -> Option<B> + Send + Sync + 'static,
    B: Send + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(FilterMapSink {
            sink,
            f: Arc::clone(&self.f),
        })
    }
}

/// FilterEffect combinator - keeps values matching an async, fallible
/// predicate.
///
/// Created by [`FxExt::filter_effect`](crate::FxExt::filter_effect).
pub struct FilterEffect<Inner, P> {
    pub(crate) inner: Inner,
    pub(crate) predicate: Arc<P>,
}

opaque_debug!(FilterEffect<Inner, P>);

struct FilterEffectSink<S, P> {
    sink: Arc<Terminal<S>>,
    predicate: Arc<P>,
}

impl<A, E, S, P, Fut> Sink<A, E> for FilterEffectSink<S, P>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    P: Fn(&A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        match (self.predicate)(&value).await {
            Ok(true) => self.sink.on_success(value).await,
            Ok(false) => {}
            Err(error) => self.sink.on_failure(Cause::fail(error)).await,
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, P, Fut> Fx for FilterEffect<Inner, P>
where
    Inner: Fx,
    P: Fn(&Inner::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool, Inner::Error>> + Send,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = FilterEffectSink {
            sink: Arc::clone(&terminal),
            predicate: Arc::clone(&self.predicate),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}

/// FilterMapEffect combinator - async, fallible [`FilterMap`].
///
/// Created by [`FxExt::filter_map_effect`](crate::FxExt::filter_map_effect).
pub struct FilterMapEffect<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(FilterMapEffect<Inner, F>);

struct FilterMapEffectSink<S, F> {
    sink: Arc<Terminal<S>>,
    f: Arc<F>,
}

impl<A, B, E, S, F, Fut> Sink<A, E> for FilterMapEffectSink<S, F>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
    S: Sink<B, E>,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<B>, E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        match (self.f)(value).await {
            Ok(Some(mapped)) => self.sink.on_success(mapped).await,
            Ok(None) => {}
            Err(error) => self.sink.on_failure(Cause::fail(error)).await,
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, Fut, B> Fx for FilterMapEffect<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<B>, Inner::Error>> + Send,
    B: Send + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = FilterMapEffectSink {
            sink: Arc::clone(&terminal),
            f: Arc::clone(&self.f),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}
