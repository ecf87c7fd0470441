//! Loop combinators - stateful mapping.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::scope::lock;
use crate::sink::{Sink, Terminal};

/// Loop combinator - threads a state through every value, emitting one
/// output per input.
///
/// Unlike [`Scan`](super::Scan), the emitted values are separate from the
/// state and the seed is not emitted.
///
/// Created by [`FxExt::loop_with`](crate::FxExt::loop_with).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// // pair every value with its index
/// let indexed = from_iterable::<_, String>(vec!['a', 'b'])
///     .loop_with(0usize, |i, c| ((i, c), i + 1));
/// assert_eq!(indexed.collect_all().await, Ok(vec![(0, 'a'), (1, 'b')]));
/// # });
/// ```
pub struct Loop<Inner, St, F> {
    pub(crate) inner: Inner,
    pub(crate) seed: St,
    pub(crate) f: Arc<F>,
}

opaque_debug!(Loop<Inner, St, F>);

struct LoopSink<S, St, F> {
    sink: S,
    state: Mutex<Option<St>>,
    f: Arc<F>,
}

impl<A, B, E, S, St, F> Sink<A, E> for LoopSink<S, St, F>
where
    A: Send + 'static,
    E: Send + 'static,
    B: Send + 'static,
    St: Send + 'static,
    S: Sink<B, E>,
    F: Fn(St, A) -> (B, St) + Send + Sync + 'static,
{
    async fn on_success(&self, value: A) {
        let emitted = {
            let mut slot = lock(&self.state);
            match slot.take() {
                Some(state) => {
                    let (out, next) = (self.f)(state, value);
                    *slot = Some(next);
                    Some(out)
                }
                None => None,
            }
        };
        if let Some(out) = emitted {
            self.sink.on_success(out).await;
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, St, F, B> Fx for Loop<Inner, St, F>
where
    Inner: Fx,
    St: Clone + Send + Sync + 'static,
    F: Fn(St, Inner::Output) -> (B, St) + Send + Sync + 'static,
    B: Send + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(LoopSink {
            sink,
            state: Mutex::new(Some(self.seed.clone())),
            f: Arc::clone(&self.f),
        })
    }
}

/// LoopEffect combinator - [`Loop`] with an async, fallible step.
///
/// Created by [`FxExt::loop_effect`](crate::FxExt::loop_effect).
pub struct LoopEffect<Inner, St, F> {
    pub(crate) inner: Inner,
    pub(crate) seed: St,
    pub(crate) f: Arc<F>,
}

opaque_debug!(LoopEffect<Inner, St, F>);

struct LoopEffectSink<S, St, F> {
    sink: Arc<Terminal<S>>,
    state: tokio::sync::Mutex<St>,
    f: Arc<F>,
}

impl<A, B, E, S, St, F, Fut> Sink<A, E> for LoopEffectSink<S, St, F>
where
    A: Send + 'static,
    B: Send + 'static,
    E: Send + 'static,
    St: Clone + Send + 'static,
    S: Sink<B, E>,
    F: Fn(St, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(B, St), E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        let mut state = self.state.lock().await;
        match (self.f)(state.clone(), value).await {
            Ok((out, next)) => {
                *state = next;
                drop(state);
                self.sink.on_success(out).await;
            }
            Err(error) => {
                drop(state);
                self.sink.on_failure(Cause::fail(error)).await;
            }
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, St, F, Fut, B> Fx for LoopEffect<Inner, St, F>
where
    Inner: Fx,
    St: Clone + Send + Sync + 'static,
    F: Fn(St, Inner::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(B, St), Inner::Error>> + Send,
    B: Send + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = LoopEffectSink {
            sink: Arc::clone(&terminal),
            state: tokio::sync::Mutex::new(self.seed.clone()),
            f: Arc::clone(&self.f),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}
