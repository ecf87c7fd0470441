//! Scan combinators - running accumulation.

use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::scope::lock;
use crate::sink::{Sink, Terminal};

/// Scan combinator - emits the seed, then the accumulated state after each
/// value.
///
/// The output is always one element longer than the input.
///
/// Created by [`FxExt::scan`](crate::FxExt::scan).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let sums = from_iterable::<_, String>(vec![1, 2, 3]).scan(0, |acc, n| acc + n);
/// assert_eq!(sums.collect_all().await, Ok(vec![0, 1, 3, 6]));
/// # });
/// ```
pub struct Scan<Inner, B, F> {
    pub(crate) inner: Inner,
    pub(crate) seed: B,
    pub(crate) f: Arc<F>,
}

opaque_debug!(Scan<Inner, B, F>);

struct ScanSink<S, B, F> {
    sink: S,
    state: Mutex<B>,
    f: Arc<F>,
}

impl<A, B, E, S, F> Sink<A, E> for ScanSink<S, B, F>
where
    A: Send + 'static,
    B: Clone + Send + 'static,
    E: Send + 'static,
    S: Sink<B, E>,
    F: Fn(B, A) -> B + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        let next = {
            let mut state = lock(&self.state);
            let next = (self.f)(state.clone(), value);
            *state = next.clone();
            next
        };
        self.sink.on_success(next)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner, B, F> Fx for Scan<Inner, B, F>
where
    Inner: Fx,
    B: Clone + Send + Sync + 'static,
    F: Fn(B, Inner::Output) -> B + Send + Sync + 'static,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        sink.on_success(self.seed.clone()).await;
        self.inner
            .run(ScanSink {
                sink,
                state: Mutex::new(self.seed.clone()),
                f: Arc::clone(&self.f),
            })
            .await
    }
}

/// ScanEffect combinator - [`Scan`] with an async, fallible reducer.
///
/// When the reducer fails the state is left unchanged and the failure ends
/// the subscription.
///
/// Created by [`FxExt::scan_effect`](crate::FxExt::scan_effect).
pub struct ScanEffect<Inner, B, F> {
    pub(crate) inner: Inner,
    pub(crate) seed: B,
    pub(crate) f: Arc<F>,
}

opaque_debug!(ScanEffect<Inner, B, F>);

struct ScanEffectSink<S, B, F> {
    sink: Arc<Terminal<S>>,
    state: tokio::sync::Mutex<B>,
    f: Arc<F>,
}

impl<A, B, E, S, F, Fut> Sink<A, E> for ScanEffectSink<S, B, F>
where
    A: Send + 'static,
    B: Clone + Send + 'static,
    E: Send + 'static,
    S: Sink<B, E>,
    F: Fn(B, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        let mut state = self.state.lock().await;
        match (self.f)(state.clone(), value).await {
            Ok(next) => {
                *state = next.clone();
                drop(state);
                self.sink.on_success(next).await;
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

impl<Inner, B, F, Fut> Fx for ScanEffect<Inner, B, F>
where
    Inner: Fx,
    B: Clone + Send + Sync + 'static,
    F: Fn(B, Inner::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<B, Inner::Error>> + Send,
{
    type Output = B;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let terminal = Arc::new(Terminal::new(sink));
        terminal.on_success(self.seed.clone()).await;
        let adapter = ScanEffectSink {
            sink: Arc::clone(&terminal),
            state: tokio::sync::Mutex::new(self.seed.clone()),
            f: Arc::clone(&self.f),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}
