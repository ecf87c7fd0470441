//! Until combinator - stop when another stream emits.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

/// Until combinator - forwards values until a signal stream emits its first
/// value.
///
/// A failure of the signal stream fails the subscription; a signal stream
/// that completes without emitting leaves the main stream running.
///
/// Created by [`FxExt::until`](crate::FxExt::until).
pub struct Until<Inner, Signal> {
    pub(crate) inner: Inner,
    pub(crate) signal: Signal,
}

opaque_debug!(Until<Inner, Signal>);

struct SignalSink<S, A> {
    sink: Arc<Terminal<S>>,
    _marker: PhantomData<fn(A)>,
}

impl<A, B, E, S> Sink<B, E> for SignalSink<S, A>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    async fn on_success(&self, _value: B) {
        self.sink.stop();
    }

    async fn on_failure(&self, cause: Cause<E>) {
        Sink::<A, E>::on_failure(&*self.sink, cause).await
    }
}

impl<Inner, Signal> Fx for Until<Inner, Signal>
where
    Inner: Fx,
    Signal: Fx<Error = Inner::Error>,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let signal_sink = SignalSink {
            sink: Arc::clone(&terminal),
            _marker: PhantomData,
        };
        terminal
            .drive(async {
                let main = self.inner.run(Arc::clone(&terminal));
                tokio::pin!(main);
                let finished = tokio::select! {
                    _ = &mut main => true,
                    _ = self.signal.run(signal_sink) => false,
                };
                if !finished {
                    main.await;
                }
            })
            .await
    }
}
