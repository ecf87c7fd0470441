//! Recovery combinators.
//!
//! [`Catch`] and [`CatchIf`] recover from typed failures only; a defect or
//! an interruption keeps propagating. [`CatchCause`] recovers from
//! everything, defects included.

use std::future::Future;
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::Sink;

/// Catch combinator - switches to a fallback stream on a typed failure.
///
/// Values emitted before the failure are kept.
///
/// Created by [`FxExt::catch`](crate::FxExt::catch).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = fail::<i32, _>("offline").catch(|_| succeed::<_, String>(0));
/// assert_eq!(fx.collect_all().await, Ok(vec![0]));
/// # });
/// ```
pub struct Catch<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(Catch<Inner, F>);

struct CatchSink<S, F> {
    sink: Arc<S>,
    f: Arc<F>,
}

impl<A, E, S, F, X> Sink<A, E> for CatchSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, X::Error>,
    F: Fn(E) -> X + Send + Sync + 'static,
    X: Fx<Output = A>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    async fn on_failure(&self, cause: Cause<E>) {
        match cause.failure_or_cause() {
            Ok(error) => (self.f)(error).run(Arc::clone(&self.sink)).await,
            Err(cause) => self.sink.on_failure(cause.strip_failures()).await,
        }
    }
}

impl<Inner, F, X> Fx for Catch<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Error) -> X + Send + Sync + 'static,
    X: Fx<Output = Inner::Output>,
{
    type Output = Inner::Output;
    type Error = X::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(CatchSink {
            sink: Arc::new(sink),
            f: Arc::clone(&self.f),
        })
    }
}

/// CatchIf combinator - recovers only from typed failures accepted by a
/// predicate; other failures propagate unchanged.
///
/// Created by [`FxExt::catch_if`](crate::FxExt::catch_if).
pub struct CatchIf<Inner, P, F> {
    pub(crate) inner: Inner,
    pub(crate) predicate: Arc<P>,
    pub(crate) f: Arc<F>,
}

opaque_debug!(CatchIf<Inner, P, F>);

struct CatchIfSink<S, P, F> {
    sink: Arc<S>,
    predicate: Arc<P>,
    f: Arc<F>,
}

impl<A, E, S, P, F, X> Sink<A, E> for CatchIfSink<S, P, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    P: Fn(&E) -> bool + Send + Sync + 'static,
    F: Fn(E) -> X + Send + Sync + 'static,
    X: Fx<Output = A, Error = E>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    async fn on_failure(&self, cause: Cause<E>) {
        let matched = cause
            .failures()
            .first()
            .is_some_and(|error| (self.predicate)(*error));
        if !matched {
            return self.sink.on_failure(cause).await;
        }
        match cause.failure_or_cause() {
            Ok(error) => (self.f)(error).run(Arc::clone(&self.sink)).await,
            Err(cause) => self.sink.on_failure(cause).await,
        }
    }
}

impl<Inner, P, F, X> Fx for CatchIf<Inner, P, F>
where
    Inner: Fx,
    P: Fn(&Inner::Error) -> bool + Send + Sync + 'static,
    F: Fn(Inner::Error) -> X + Send + Sync + 'static,
    X: Fx<Output = Inner::Output, Error = Inner::Error>,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(CatchIfSink {
            sink: Arc::new(sink),
            predicate: Arc::clone(&self.predicate),
            f: Arc::clone(&self.f),
        })
    }
}

/// CatchCause combinator - switches to a fallback stream on any failure,
/// defects and interruptions included.
///
/// Created by [`FxExt::catch_cause`](crate::FxExt::catch_cause).
pub struct CatchCause<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(CatchCause<Inner, F>);

struct CatchCauseSink<S, F> {
    sink: Arc<S>,
    f: Arc<F>,
}

impl<A, E, S, F, X> Sink<A, E> for CatchCauseSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, X::Error>,
    F: Fn(Cause<E>) -> X + Send + Sync + 'static,
    X: Fx<Output = A>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    async fn on_failure(&self, cause: Cause<E>) {
        (self.f)(cause).run(Arc::clone(&self.sink)).await
    }
}

impl<Inner, F, X> Fx for CatchCause<Inner, F>
where
    Inner: Fx,
    F: Fn(Cause<Inner::Error>) -> X + Send + Sync + 'static,
    X: Fx<Output = Inner::Output>,
{
    type Output = Inner::Output;
    type Error = X::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(CatchCauseSink {
            sink: Arc::new(sink),
            f: Arc::clone(&self.f),
        })
    }
}

/// OrElseSucceed combinator - replaces a typed failure by one final value.
///
/// Created by [`FxExt::or_else_succeed`](crate::FxExt::or_else_succeed).
pub struct OrElseSucceed<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(OrElseSucceed<Inner, F>);

struct OrElseSucceedSink<S, F> {
    sink: S,
    f: Arc<F>,
}

impl<A, E, S, F> Sink<A, E> for OrElseSucceedSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    F: Fn(E) -> A + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    async fn on_failure(&self, cause: Cause<E>) {
        match cause.failure_or_cause() {
            Ok(error) => self.sink.on_success((self.f)(error)).await,
            Err(cause) => self.sink.on_failure(cause).await,
        }
    }
}

impl<Inner, F> Fx for OrElseSucceed<Inner, F>
where
    Inner: Fx,
    F: Fn(Inner::Error) -> Inner::Output + Send + Sync + 'static,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(OrElseSucceedSink {
            sink,
            f: Arc::clone(&self.f),
        })
    }
}
