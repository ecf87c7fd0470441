//! Failure-channel transformations.
//!
//! These only ever touch typed failures ([`Cause::Fail`]); defects and
//! interruptions pass through untouched, except for [`MapCause`] which is
//! handed the whole cause.

use std::future::Future;
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::Sink;

/// MapError combinator - transforms typed failures.
///
/// Created by [`FxExt::map_error`](crate::FxExt::map_error).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = fail::<i32, _>(404).map_error(|code| format!("status {code}"));
/// assert_eq!(fx.collect_all().await, Err(Cause::fail("status 404".to_string())));
/// # });
/// ```
pub struct MapError<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(MapError<Inner, F>);

struct MapErrorSink<S, F> {
    sink: S,
    f: Arc<F>,
}

impl<A, E, E2, S, F> Sink<A, E> for MapErrorSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E2>,
    F: Fn(E) -> E2 + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause.map(|e| (self.f)(e)))
    }
}

impl<Inner, F, E2> Fx for MapError<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Error) -> E2 + Send + Sync + 'static,
    E2: Send + 'static,
{
    type Output = Inner::Output;
    type Error = E2;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(MapErrorSink {
            sink,
            f: Arc::clone(&self.f),
        })
    }
}

/// MapCause combinator - transforms the whole failure cause.
///
/// Created by [`FxExt::map_cause`](crate::FxExt::map_cause).
pub struct MapCause<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(MapCause<Inner, F>);

struct MapCauseSink<S, F> {
    sink: S,
    f: Arc<F>,
}

impl<A, E, E2, S, F> Sink<A, E> for MapCauseSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E2>,
    F: Fn(Cause<E>) -> Cause<E2> + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure((self.f)(cause))
    }
}

impl<Inner, F, E2> Fx for MapCause<Inner, F>
where
    Inner: Fx,
    F: Fn(Cause<Inner::Error>) -> Cause<E2> + Send + Sync + 'static,
    E2: Send + 'static,
{
    type Output = Inner::Output;
    type Error = E2;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(MapCauseSink {
            sink,
            f: Arc::clone(&self.f),
        })
    }
}

/// MapBoth combinator - transforms values and typed failures at once.
///
/// Created by [`FxExt::map_both`](crate::FxExt::map_both).
pub struct MapBoth<Inner, F, G> {
    pub(crate) inner: Inner,
    pub(crate) on_error: Arc<F>,
    pub(crate) on_value: Arc<G>,
}

opaque_debug!(MapBoth<Inner, F, G>);

struct MapBothSink<S, F, G> {
    sink: S,
    on_error: Arc<F>,
    on_value: Arc<G>,
}

impl<A, B, E, E2, S, F, G> Sink<A, E> for MapBothSink<S, F, G>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<B, E2>,
    F: Fn(E) -> E2 + Send + Sync + 'static,
    G: Fn(A) -> B + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success((self.on_value)(value))
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause.map(|e| (self.on_error)(e)))
    }
}

impl<Inner, F, G, B, E2> Fx for MapBoth<Inner, F, G>
where
    Inner: Fx,
    F: Fn(Inner::Error) -> E2 + Send + Sync + 'static,
    G: Fn(Inner::Output) -> B + Send + Sync + 'static,
    B: Send + 'static,
    E2: Send + 'static,
{
    type Output = B;
    type Error = E2;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(MapBothSink {
            sink,
            on_error: Arc::clone(&self.on_error),
            on_value: Arc::clone(&self.on_value),
        })
    }
}
