//! Primitive producers.
//!
//! Every source here is cold: each [`Fx::run`] starts it from the beginning.

use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use crate::cause::{Cause, Exit};
use crate::fx::trait_def::Fx;
use crate::schedule::Schedule;
use crate::scope::{Scope, ScopeHandle};
use crate::sink::{BoxedSink, Sink};

/// Synchronous sources give the runtime a chance to observe cancellation
/// after this many values.
const YIELD_EVERY: usize = 128;

/// Producer built from an async function over a sink. Created by [`make`].
pub struct Make<F, A, E> {
    f: F,
    _marker: PhantomData<fn() -> (A, E)>,
}

opaque_debug!(Make<F, A, E>);

/// Lift an async function over a [`BoxedSink`] into a producer.
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = undertow::fx::make(|sink: BoxedSink<i32, String>| async move {
///     sink.on_success(1).await;
///     sink.on_success(2).await;
/// });
/// assert_eq!(fx.collect_all().await, Ok(vec![1, 2]));
/// # });
/// ```
pub fn make<A, E, F, Fut>(f: F) -> Make<F, A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn(BoxedSink<A, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    Make {
        f,
        _marker: PhantomData,
    }
}

impl<F, A, E, Fut> Fx for Make<F, A, E>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn(BoxedSink<A, E>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send,
{
    type Output = A;
    type Error = E;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        (self.f)(BoxedSink::new(sink))
    }
}

/// Emits one value, then completes. Created by [`succeed`].
pub struct Succeed<A, E> {
    value: A,
    _marker: PhantomData<fn() -> E>,
}

opaque_debug!(Succeed<A, E>);

/// A producer of exactly one value.
pub fn succeed<A, E>(value: A) -> Succeed<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    Succeed {
        value,
        _marker: PhantomData,
    }
}

impl<A, E> Fx for Succeed<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Error = E;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let value = self.value.clone();
        async move { sink.on_success(value).await }
    }
}

/// Fails immediately. Created by [`fail`], [`fail_cause`] and [`die`].
pub struct FailCause<A, E> {
    cause: Cause<E>,
    _marker: PhantomData<fn() -> A>,
}

opaque_debug!(FailCause<A, E>);

/// A producer that fails with a typed error.
pub fn fail<A, E>(error: E) -> FailCause<A, E>
where
    A: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    fail_cause(Cause::fail(error))
}

/// A producer that fails with `cause`.
pub fn fail_cause<A, E>(cause: Cause<E>) -> FailCause<A, E>
where
    A: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    FailCause {
        cause,
        _marker: PhantomData,
    }
}

/// A producer that fails with a defect.
pub fn die<A, E>(message: impl Into<String>) -> FailCause<A, E>
where
    A: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    fail_cause(Cause::die_message(message))
}

impl<A, E> Fx for FailCause<A, E>
where
    A: Send + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = A;
    type Error = E;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let cause = self.cause.clone();
        async move { sink.on_failure(cause).await }
    }
}

/// Replays an exit. Created by [`from_exit`].
pub struct FromExit<A, E> {
    exit: Exit<A, E>,
}

opaque_debug!(FromExit<A, E>);

/// One value on `Ok`, one failure on `Err`.
pub fn from_exit<A, E>(exit: Exit<A, E>) -> FromExit<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    FromExit { exit }
}

impl<A, E> Fx for FromExit<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = A;
    type Error = E;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let exit = self.exit.clone();
        async move {
            match exit {
                Ok(value) => sink.on_success(value).await,
                Err(cause) => sink.on_failure(cause).await,
            }
        }
    }
}

/// Enumerates a collection. Created by [`from_iterable`].
pub struct FromIterable<I, E> {
    items: I,
    _marker: PhantomData<fn() -> E>,
}

opaque_debug!(FromIterable<I, E>);

/// Emit every item of `items` in order, then complete.
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(vec![1, 2, 3]);
/// assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
/// # });
/// ```
pub fn from_iterable<I, E>(items: I) -> FromIterable<I, E>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send,
    I::Item: Send + 'static,
    E: Send + 'static,
{
    FromIterable {
        items,
        _marker: PhantomData,
    }
}

impl<I, E> Fx for FromIterable<I, E>
where
    I: IntoIterator + Clone + Send + Sync + 'static,
    I::IntoIter: Send,
    I::Item: Send + 'static,
    E: Send + 'static,
{
    type Output = I::Item;
    type Error = E;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        for (n, item) in self.items.clone().into_iter().enumerate() {
            sink.on_success(item).await;
            if (n + 1) % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }
        }
    }
}

/// Runs a one-shot async computation. Created by [`from_effect`].
pub struct FromEffect<F> {
    f: F,
}

opaque_debug!(FromEffect<F>);

/// Run `f` once per subscription: its `Ok` becomes the single value, its
/// `Err` the failure.
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_effect(|| async { Ok::<_, String>(42) });
/// assert_eq!(fx.collect_all().await, Ok(vec![42]));
/// # });
/// ```
pub fn from_effect<A, E, F, Fut>(f: F) -> FromEffect<F>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send,
{
    FromEffect { f }
}

impl<A, E, F, Fut> Fx for FromEffect<F>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        match (self.f)().await {
            Ok(value) => sink.on_success(value).await,
            Err(error) => sink.on_failure(Cause::fail(error)).await,
        }
    }
}

/// Runs a one-shot computation producing a full exit. Created by
/// [`from_future`].
pub struct FromFuture<F> {
    f: F,
}

opaque_debug!(FromFuture<F>);

/// Like [`from_effect`], but the computation reports an [`Exit`], so it may
/// fail with any cause.
pub fn from_future<A, E, F, Fut>(f: F) -> FromFuture<F>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Exit<A, E>> + Send,
{
    FromFuture { f }
}

impl<A, E, F, Fut> Fx for FromFuture<F>
where
    A: Send + 'static,
    E: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Exit<A, E>> + Send,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        match (self.f)().await {
            Ok(value) => sink.on_success(value).await,
            Err(cause) => sink.on_failure(cause).await,
        }
    }
}

/// Emits `()` on every recurrence of a schedule. Created by
/// [`from_schedule`] and [`periodic`].
pub struct FromSchedule<E> {
    schedule: Schedule,
    _marker: PhantomData<fn() -> E>,
}

opaque_debug!(FromSchedule<E>);

/// Emit `()` after each delay of `schedule`; complete when it is exhausted.
pub fn from_schedule<E>(schedule: Schedule) -> FromSchedule<E>
where
    E: Send + 'static,
{
    FromSchedule {
        schedule,
        _marker: PhantomData,
    }
}

/// Emit `()` every `period`, forever.
pub fn periodic<E>(period: Duration) -> FromSchedule<E>
where
    E: Send + 'static,
{
    from_schedule(Schedule::spaced(period))
}

impl<E> Fx for FromSchedule<E>
where
    E: Send + 'static,
{
    type Output = ();
    type Error = E;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        for delay in self.schedule.recurrences() {
            tokio::time::sleep(delay).await;
            sink.on_success(()).await;
        }
    }
}

/// Emits one value after a delay. Created by [`at`].
pub struct At<A, E> {
    value: A,
    delay: Duration,
    _marker: PhantomData<fn() -> E>,
}

opaque_debug!(At<A, E>);

/// Emit `value` once `delay` has elapsed.
pub fn at<A, E>(value: A, delay: Duration) -> At<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    At {
        value,
        delay,
        _marker: PhantomData,
    }
}

impl<A, E> Fx for At<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        tokio::time::sleep(self.delay).await;
        sink.on_success(self.value.clone()).await;
    }
}

/// Completes after a delay without emitting. Created by [`sleep`].
pub struct Sleep<A, E> {
    duration: Duration,
    _marker: PhantomData<fn() -> (A, E)>,
}

opaque_debug!(Sleep<A, E>);

/// A producer that waits for `duration`, then completes.
pub fn sleep<A, E>(duration: Duration) -> Sleep<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Sleep {
        duration,
        _marker: PhantomData,
    }
}

impl<A, E> Fx for Sleep<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, _sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        tokio::time::sleep(self.duration).await
    }
}

/// Never emits and never completes. Created by [`never`].
pub struct Never<A, E> {
    _marker: PhantomData<fn() -> (A, E)>,
}

opaque_debug!(Never<A, E>);

/// A producer that stays silent until its subscription is dropped.
pub fn never<A, E>() -> Never<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Never {
        _marker: PhantomData,
    }
}

impl<A, E> Fx for Never<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, _sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        std::future::pending::<()>().await
    }
}

/// Completes immediately. Created by [`empty`].
pub struct Empty<A, E> {
    _marker: PhantomData<fn() -> (A, E)>,
}

opaque_debug!(Empty<A, E>);

/// A producer that completes without emitting.
pub fn empty<A, E>() -> Empty<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    Empty {
        _marker: PhantomData,
    }
}

impl<A, E> Fx for Empty<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, _sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
    }
}

/// Builds its producer at subscription time. Created by [`suspend`].
pub struct Suspend<F> {
    f: F,
}

opaque_debug!(Suspend<F>);

/// Defer construction of a producer until it is run.
pub fn suspend<X, F>(f: F) -> Suspend<F>
where
    X: Fx,
    F: Fn() -> X + Send + Sync + 'static,
{
    Suspend { f }
}

impl<X, F> Fx for Suspend<F>
where
    X: Fx,
    F: Fn() -> X + Send + Sync + 'static,
{
    type Output = X::Output;
    type Error = X::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        (self.f)().run(sink).await
    }
}

/// Computes its producer at subscription time. Created by [`unwrap`].
pub struct Unwrap<F> {
    f: F,
}

opaque_debug!(Unwrap<F>);

/// Run an async computation that yields the producer to subscribe to.
pub fn unwrap<X, F, Fut>(f: F) -> Unwrap<F>
where
    X: Fx,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<X, X::Error>> + Send,
{
    Unwrap { f }
}

impl<X, F, Fut> Fx for Unwrap<F>
where
    X: Fx,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<X, X::Error>> + Send,
{
    type Output = X::Output;
    type Error = X::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        match (self.f)().await {
            Ok(fx) => fx.run(sink).await,
            Err(error) => sink.on_failure(Cause::fail(error)).await,
        }
    }
}

/// Like [`Unwrap`], with a scope bound to the subscription. Created by
/// [`unwrap_scoped`].
pub struct UnwrapScoped<F> {
    f: F,
}

opaque_debug!(UnwrapScoped<F>);

/// Run an async computation that acquires resources in a subscription
/// scope and yields the producer to subscribe to.
///
/// The scope handed to `f` is closed when the subscription ends, running
/// its finalizers and interrupting anything forked into it.
pub fn unwrap_scoped<X, F, Fut>(f: F) -> UnwrapScoped<F>
where
    X: Fx,
    F: Fn(ScopeHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<X, X::Error>> + Send,
{
    UnwrapScoped { f }
}

impl<X, F, Fut> Fx for UnwrapScoped<F>
where
    X: Fx,
    F: Fn(ScopeHandle) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<X, X::Error>> + Send,
{
    type Output = X::Output;
    type Error = X::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let scope = Scope::new();
        match (self.f)(scope.handle()).await {
            Ok(fx) => fx.run(sink).await,
            Err(error) => sink.on_failure(Cause::fail(error)).await,
        }
        scope.close().await;
    }
}
