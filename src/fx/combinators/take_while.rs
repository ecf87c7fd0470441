//! Predicate-bounded prefixes and suffixes.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

/// Where a [`TakeWhile`] stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    /// Stop before the first value for which the predicate is false.
    While,
    /// Stop before the first value for which the predicate is true.
    Until,
    /// Emit the first value for which the predicate is true, then stop.
    After,
}

/// TakeWhile combinator - keeps a prefix of the stream decided by a
/// predicate, then stops the upstream.
///
/// Created by [`FxExt::take_while`](crate::FxExt::take_while),
/// [`FxExt::take_until`](crate::FxExt::take_until) and
/// [`FxExt::drop_after`](crate::FxExt::drop_after).
pub struct TakeWhile<Inner, P> {
    pub(crate) inner: Inner,
    pub(crate) predicate: Arc<P>,
    pub(crate) stop: Stop,
}

opaque_debug!(TakeWhile<Inner, P>);

struct TakeWhileSink<S, P> {
    sink: Arc<Terminal<S>>,
    predicate: Arc<P>,
    stop: Stop,
}

impl<A, E, S, P> Sink<A, E> for TakeWhileSink<S, P>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        let matched = (self.predicate)(&value);
        match (self.stop, matched) {
            (Stop::While, true) | (Stop::Until, false) | (Stop::After, false) => {
                self.sink.on_success(value).await
            }
            (Stop::While, false) | (Stop::Until, true) => self.sink.stop(),
            (Stop::After, true) => self.sink.last(value).await,
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, P> Fx for TakeWhile<Inner, P>
where
    Inner: Fx,
    P: Fn(&Inner::Output) -> bool + Send + Sync + 'static,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = TakeWhileSink {
            sink: Arc::clone(&terminal),
            predicate: Arc::clone(&self.predicate),
            stop: self.stop,
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}

/// SkipWhile combinator - drops a prefix of the stream decided by a
/// predicate, then forwards everything.
///
/// Created by [`FxExt::skip_while`](crate::FxExt::skip_while) and
/// [`FxExt::skip_until`](crate::FxExt::skip_until).
pub struct SkipWhile<Inner, P> {
    pub(crate) inner: Inner,
    pub(crate) predicate: Arc<P>,
    /// Keep skipping while the predicate returns this value.
    pub(crate) skip_on: bool,
}

opaque_debug!(SkipWhile<Inner, P>);

struct SkipWhileSink<S, P> {
    sink: S,
    predicate: Arc<P>,
    skip_on: bool,
    open: AtomicBool,
}

impl<A, E, S, P> Sink<A, E> for SkipWhileSink<S, P>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    async fn on_success(&self, value: A) {
        if !self.open.load(Ordering::SeqCst) {
            if (self.predicate)(&value) == self.skip_on {
                return;
            }
            self.open.store(true, Ordering::SeqCst);
        }
        self.sink.on_success(value).await
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, P> Fx for SkipWhile<Inner, P>
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
        self.inner.run(SkipWhileSink {
            sink,
            predicate: Arc::clone(&self.predicate),
            skip_on: self.skip_on,
            open: AtomicBool::new(false),
        })
    }
}
