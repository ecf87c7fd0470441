//! ExhaustMap combinator - ignore values while busy.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cause::Cause;
use crate::fx::concurrency::{fork_guarded, scoped};
use crate::fx::trait_def::Fx;
use crate::scope::{lock, Fiber, ScopeHandle};
use crate::sink::{Sink, Terminal};

/// ExhaustMap combinator - maps a value to an inner stream only when no
/// inner stream is running; values arriving in the meantime are dropped.
///
/// Created by [`FxExt::exhaust_map`](crate::FxExt::exhaust_map).
pub struct ExhaustMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(ExhaustMap<Inner, F>);

struct ExhaustMapSink<S, F> {
    sink: Arc<Terminal<S>>,
    scope: ScopeHandle,
    f: Arc<F>,
    current: Mutex<Option<Fiber>>,
}

impl<A, E, S, F, X> Sink<A, E> for ExhaustMapSink<S, F>
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
        let mut current = lock(&self.current);
        if current.as_ref().is_some_and(|fiber| !fiber.is_done()) {
            tracing::trace!("exhaust_map: busy, dropping value");
            return;
        }
        let inner = (self.f)(value);
        let sink = Arc::clone(&self.sink);
        *current = Some(fork_guarded::<X::Output, E, _, _>(
            &self.scope,
            &self.sink,
            async move { inner.run(sink).await },
        ));
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, X> Fx for ExhaustMap<Inner, F>
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
        scoped(sink, |sink, scope| {
            self.inner.run(ExhaustMapSink {
                sink,
                scope,
                f: Arc::clone(&self.f),
                current: Mutex::new(None),
            })
        })
        .await
    }
}
