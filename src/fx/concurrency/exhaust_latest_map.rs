//! ExhaustLatestMap combinator - keep the newest value while busy.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cause::Cause;
use crate::fx::concurrency::{guarded, scoped};
use crate::fx::trait_def::Fx;
use crate::scope::{lock, ScopeHandle};
use crate::sink::{Sink, Terminal};

/// ExhaustLatestMap combinator - like [`ExhaustMap`](super::ExhaustMap), but
/// the most recent value that arrived while busy is kept and run as soon as
/// the current inner stream ends.
///
/// Only one value is buffered: a newer arrival overwrites an older pending
/// one, and the last value of the upstream is never lost.
///
/// Created by [`FxExt::exhaust_latest_map`](crate::FxExt::exhaust_latest_map).
pub struct ExhaustLatestMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(ExhaustLatestMap<Inner, F>);

struct Slots<A> {
    running: bool,
    pending: Option<A>,
}

struct ExhaustLatestSink<S, F, A> {
    sink: Arc<Terminal<S>>,
    scope: ScopeHandle,
    f: Arc<F>,
    slots: Arc<Mutex<Slots<A>>>,
}

impl<A, E, S, F, X> Sink<A, E> for ExhaustLatestSink<S, F, A>
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
        {
            let mut slots = lock(&self.slots);
            if slots.running {
                if slots.pending.replace(value).is_some() {
                    tracing::trace!("exhaust_latest_map: pending value replaced");
                }
                return;
            }
            slots.running = true;
        }

        let f = Arc::clone(&self.f);
        let sink = Arc::clone(&self.sink);
        let slots = Arc::clone(&self.slots);
        self.scope.fork(async move {
            let mut next = Some(value);
            while let Some(value) = next {
                let inner = async { f(value).run(Arc::clone(&sink)).await };
                if !guarded::<X::Output, E, _, _>(&sink, inner).await {
                    let mut slots = lock(&slots);
                    slots.running = false;
                    slots.pending = None;
                    return;
                }
                next = {
                    let mut slots = lock(&slots);
                    let pending = slots.pending.take();
                    if pending.is_none() {
                        slots.running = false;
                    }
                    pending
                };
            }
        });
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, F, X> Fx for ExhaustLatestMap<Inner, F>
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
            self.inner.run(ExhaustLatestSink {
                sink,
                scope,
                f: Arc::clone(&self.f),
                slots: Arc::new(Mutex::new(Slots {
                    running: false,
                    pending: None,
                })),
            })
        })
        .await
    }
}
