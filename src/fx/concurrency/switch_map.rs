//! SwitchMap combinator - only the latest inner stream runs.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cause::Cause;
use crate::fx::concurrency::{fork_guarded, scoped};
use crate::fx::trait_def::Fx;
use crate::scope::{Fiber, ScopeHandle};
use crate::sink::{Sink, Terminal};

/// SwitchMap combinator - maps every value to an inner stream, interrupting
/// the previous inner stream first.
///
/// The previous inner stream has fully terminated (its finalizers included)
/// before the next one starts, so at most one inner stream is ever active.
/// When the upstream completes, the subscription waits for the last inner
/// stream.
///
/// Created by [`FxExt::switch_map`](crate::FxExt::switch_map).
pub struct SwitchMap<Inner, F> {
    pub(crate) inner: Inner,
    pub(crate) f: Arc<F>,
}

opaque_debug!(SwitchMap<Inner, F>);

struct SwitchMapSink<S, F> {
    sink: Arc<Terminal<S>>,
    scope: ScopeHandle,
    f: Arc<F>,
    current: Mutex<Option<Fiber>>,
}

impl<A, E, S, F, X> Sink<A, E> for SwitchMapSink<S, F>
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
        let mut current = self.current.lock().await;
        if let Some(previous) = current.take() {
            let id = previous.id();
            let exit = previous.interrupt().await;
            tracing::trace!(fiber = %id, ?exit, "switch_map: interrupted previous inner stream");
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

impl<Inner, F, X> Fx for SwitchMap<Inner, F>
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
            self.inner.run(SwitchMapSink {
                sink,
                scope,
                f: Arc::clone(&self.f),
                current: Mutex::new(None),
            })
        })
        .await
    }
}
