//! Materialize the failure channel into values.
//!
//! The resulting streams never fail with a typed error, which is how a
//! failure-prone branch is fed to combinators that expect uniform success
//! handling.

use std::convert::Infallible;
use std::future::Future;
use std::marker::PhantomData;

use crate::cause::{Cause, Exit};
use crate::fx::trait_def::Fx;
use crate::sink::Sink;

/// ExitOf combinator - every value becomes `Ok(value)`, the terminal failure
/// becomes one final `Err(cause)` value.
///
/// Created by [`FxExt::exit`](crate::FxExt::exit).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let exits = fail::<i32, _>("boom").exit().collect_all().await;
/// assert_eq!(exits, Ok(vec![Err(Cause::fail("boom"))]));
/// # });
/// ```
#[derive(Debug)]
pub struct ExitOf<Inner> {
    pub(crate) inner: Inner,
}

struct ExitSink<S, E> {
    sink: S,
    _marker: PhantomData<fn(E)>,
}

impl<A, E, S> Sink<A, E> for ExitSink<S, E>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<Exit<A, E>, Infallible>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(Ok(value))
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_success(Err(cause))
    }
}

impl<Inner: Fx> Fx for ExitOf<Inner> {
    type Output = Exit<Inner::Output, Inner::Error>;
    type Error = Infallible;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(ExitSink {
            sink,
            _marker: PhantomData,
        })
    }
}

/// ResultOf combinator - typed failures become a final `Err(error)` value.
///
/// Defects and interruptions stay on the failure channel, so a bug is never
/// disguised as a domain error.
///
/// Created by [`FxExt::result`](crate::FxExt::result).
#[derive(Debug)]
pub struct ResultOf<Inner> {
    pub(crate) inner: Inner,
}

struct ResultSink<S, E> {
    sink: S,
    _marker: PhantomData<fn(E)>,
}

impl<A, E, S> Sink<A, E> for ResultSink<S, E>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<Result<A, E>, Infallible>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(Ok(value))
    }

    async fn on_failure(&self, cause: Cause<E>) {
        match cause.failure_or_cause() {
            Ok(error) => self.sink.on_success(Err(error)).await,
            Err(cause) => self.sink.on_failure(cause.strip_failures()).await,
        }
    }
}

impl<Inner: Fx> Fx for ResultOf<Inner> {
    type Output = Result<Inner::Output, Inner::Error>;
    type Error = Infallible;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(ResultSink {
            sink,
            _marker: PhantomData,
        })
    }
}

/// Causes combinator - drops every value and emits the terminal failure as
/// a value.
///
/// Created by [`FxExt::causes`](crate::FxExt::causes).
#[derive(Debug)]
pub struct Causes<Inner> {
    pub(crate) inner: Inner,
}

struct CausesSink<S, A> {
    sink: S,
    _marker: PhantomData<fn(A)>,
}

impl<A, E, S> Sink<A, E> for CausesSink<S, A>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<Cause<E>, Infallible>,
{
    async fn on_success(&self, _value: A) {}

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_success(cause)
    }
}

impl<Inner: Fx> Fx for Causes<Inner> {
    type Output = Cause<Inner::Error>;
    type Error = Infallible;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(CausesSink {
            sink,
            _marker: PhantomData,
        })
    }
}
