//! Runners - terminal consumption of producers.
//!
//! The functions here back the runner methods of [`FxExt`](crate::FxExt).
//! Every runner catches a panic raised while the producer runs and reports
//! it as [`Cause::Die`](crate::Cause::Die).

use std::convert::Infallible;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock, Mutex};

use futures::FutureExt;

use crate::cause::{Cause, Defect, Exit, FiberId};
use crate::fx::trait_def::Fx;
use crate::scope::{lock, Fiber, Scope, ScopeHandle};
use crate::sink::{Sink, Terminal};

/// Owner of the fibers started by [`FxExt::run_fork`](crate::FxExt::run_fork).
static DETACHED: LazyLock<Scope> = LazyLock::new(Scope::new);

/// Records every value and the first failure of one subscription.
struct Collect<A, E> {
    values: Mutex<Vec<A>>,
    failure: Mutex<Option<Cause<E>>>,
    keep_values: bool,
}

impl<A, E> Collect<A, E> {
    fn new(keep_values: bool) -> Arc<Self> {
        Arc::new(Collect {
            values: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            keep_values,
        })
    }

    fn take_exit(&self) -> Exit<Vec<A>, E> {
        if let Some(cause) = lock(&self.failure).take() {
            return Err(cause);
        }
        Ok(std::mem::take(&mut *lock(&self.values)))
    }
}

impl<A, E> Sink<A, E> for Collect<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    async fn on_success(&self, value: A) {
        if self.keep_values {
            lock(&self.values).push(value);
        }
    }

    async fn on_failure(&self, cause: Cause<E>) {
        lock(&self.failure).get_or_insert(cause);
    }
}

/// Await `fut`, turning a panic into a defect.
async fn guarded<E, F>(fut: F) -> Exit<(), E>
where
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(()) => Ok(()),
        Err(payload) => {
            let defect = Defect::from_panic(payload);
            tracing::warn!(defect = %defect, "producer panicked");
            Err(Cause::die(defect))
        }
    }
}

pub(crate) async fn collect_all<X: Fx>(fx: &X) -> Exit<Vec<X::Output>, X::Error> {
    let collect = Collect::new(true);
    guarded::<X::Error, _>(fx.run(Arc::clone(&collect))).await?;
    collect.take_exit()
}

pub(crate) async fn drain<X: Fx>(fx: &X) -> Exit<(), X::Error> {
    let collect = Collect::<X::Output, X::Error>::new(false);
    guarded::<X::Error, _>(fx.run(Arc::clone(&collect))).await?;
    collect.take_exit().map(|_| ())
}

struct FirstSink<S> {
    sink: Arc<Terminal<S>>,
}

impl<A, E, S> Sink<A, E> for FirstSink<S>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.last(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

pub(crate) async fn first<X: Fx>(fx: &X) -> Exit<Option<X::Output>, X::Error> {
    let collect = Collect::new(true);
    let terminal = Arc::new(Terminal::new(Arc::clone(&collect)));
    let sink = FirstSink {
        sink: Arc::clone(&terminal),
    };
    guarded::<X::Error, _>(terminal.drive(fx.run(sink))).await?;
    Ok(collect.take_exit()?.into_iter().next())
}

struct ObserveSink<S, F> {
    sink: Arc<Terminal<S>>,
    f: F,
}

impl<A, E, S, F, Fut> Sink<A, E> for ObserveSink<S, F>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        if let Err(error) = (self.f)(value).await {
            Sink::<A, E>::on_failure(&*self.sink, Cause::fail(error)).await;
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        Sink::<A, E>::on_failure(&*self.sink, cause)
    }
}

pub(crate) async fn observe<X, F, Fut>(fx: &X, f: F) -> Exit<(), X::Error>
where
    X: Fx,
    F: Fn(X::Output) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), X::Error>> + Send,
{
    let collect = Collect::<X::Output, X::Error>::new(false);
    let terminal = Arc::new(Terminal::new(Arc::clone(&collect)));
    let sink = ObserveSink {
        sink: Arc::clone(&terminal),
        f,
    };
    guarded::<X::Error, _>(terminal.drive(fx.run(sink))).await?;
    collect.take_exit().map(|_| ())
}

fn widen<E>(cause: Cause<Infallible>) -> Cause<E> {
    cause.map(|never| match never {})
}

/// A producer draining on a background fiber.
///
/// Created by [`FxExt::fork`](crate::FxExt::fork) and
/// [`FxExt::run_fork`](crate::FxExt::run_fork).
///
/// ```rust
/// use undertow::prelude::*;
/// use undertow::Scope;
///
/// # tokio_test::block_on(async {
/// let scope = Scope::new();
/// let fiber = never::<i32, String>().fork(&scope);
///
/// fiber.interrupt().await;
/// assert!(fiber.join().await.unwrap_err().is_interrupted());
/// # });
/// ```
pub struct FxFiber<E> {
    fiber: Fiber,
    exit: Arc<Mutex<Option<Exit<(), E>>>>,
}

impl<E> std::fmt::Debug for FxFiber<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FxFiber").field("fiber", &self.fiber).finish()
    }
}

impl<E: Send + 'static> FxFiber<E> {
    pub(crate) fn spawn<X>(fx: X, scope: &ScopeHandle) -> Self
    where
        X: Fx<Error = E>,
    {
        let exit = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&exit);
        let fiber = scope.fork(async move {
            let outcome = drain(&fx).await;
            *lock(&slot) = Some(outcome);
        });
        tracing::debug!(fiber = %fiber.id(), "forked producer");
        FxFiber { fiber, exit }
    }

    pub(crate) fn detached<X>(fx: X) -> Self
    where
        X: Fx<Error = E>,
    {
        Self::spawn(fx, DETACHED.as_ref())
    }

    /// The id of the underlying fiber.
    pub fn id(&self) -> FiberId {
        self.fiber.id()
    }

    /// Returns `true` once the producer has terminated.
    pub fn is_done(&self) -> bool {
        self.fiber.is_done()
    }

    /// Wait for the producer to terminate and return its exit.
    ///
    /// A fiber that was interrupted before the producer ended reports
    /// [`Cause::Interrupt`].
    pub async fn join(self) -> Exit<(), E> {
        self.fiber.join().await.map_err(widen)?;
        lock(&self.exit).take().unwrap_or(Ok(()))
    }

    /// Interrupt the producer and wait until it has stopped.
    pub async fn interrupt(&self) {
        let _ = self.fiber.interrupt().await;
    }
}
