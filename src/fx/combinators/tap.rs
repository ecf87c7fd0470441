//! Tap combinators - observe values without changing them.

use std::future::Future;
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

/// Tap combinator - runs a side effect on every value.
///
/// Created by [`FxExt::tap`](crate::FxExt::tap).
pub struct Tap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(Tap<Inner, F>);

struct TapSink<S, F> {
    sink: S,
    f: Arc<F>,
}

impl<A, E, S, F> Sink<A, E> for TapSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    F: Fn(&A) + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        (self.f)(&value);
        self.sink.on_success(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F> Fx for Tap<Inner, F>
where
    Inner: Fx,
    F: Fn(&Inner::Output) + Send + Sync + 'static,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(TapSink {
            sink,
            f: Arc::clone(&self.f),
        })
    }
}

/// TapEffect combinator - runs an async, fallible side effect on every
/// value before forwarding it.
///
/// Created by [`FxExt::tap_effect`](crate::FxExt::tap_effect).
pub struct TapEffect<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(TapEffect<Inner, F>);

struct TapEffectSink<S, F> {
    sink: Arc<Terminal<S>>,
    f: Arc<F>,
}

impl<A, E, S, F, Fut> Sink<A, E> for TapEffectSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    F: Fn(&A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        match (self.f)(&value).await {
            Ok(()) => self.sink.on_success(value).await,
            Err(error) => self.sink.on_failure(Cause::fail(error)).await,
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, Fut> Fx for TapEffect<Inner, F>
where
    Inner: Fx,
    F: Fn(&Inner::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Inner::Error>> + Send,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = TapEffectSink {
            sink: Arc::clone(&terminal),
            f: Arc::clone(&self.f),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}
