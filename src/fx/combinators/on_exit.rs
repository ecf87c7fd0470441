//! Lifecycle hooks.
//!
//! A hook observes how a subscription ended: it completed, it failed, or it
//! was dropped before either happened (interruption). Each hook fires at most
//! once per subscription, however many of those paths are taken.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cause::{Cause, Exit, FiberId};
use crate::fx::trait_def::Fx;
use crate::sink::Sink;

/// A callback observing the end of a subscription.
pub trait ExitHook<E>: Send + Sync + 'static {
    /// Called exactly once with the subscription's outcome.
    fn call(&self, exit: &Exit<(), E>);
}

/// Runs on every outcome. See [`FxExt::ensuring`](crate::FxExt::ensuring).
#[derive(Debug, Clone)]
pub struct Always<F>(pub(crate) F);

/// Receives the outcome. See [`FxExt::on_exit`](crate::FxExt::on_exit).
#[derive(Debug, Clone)]
pub struct Exited<F>(pub(crate) F);

/// Runs on interruption only. See
/// [`FxExt::on_interrupt`](crate::FxExt::on_interrupt).
#[derive(Debug, Clone)]
pub struct Interrupted<F>(pub(crate) F);

/// Runs on failures other than interruption. See
/// [`FxExt::on_error`](crate::FxExt::on_error).
#[derive(Debug, Clone)]
pub struct Errored<F>(pub(crate) F);

impl<E, F> ExitHook<E> for Always<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn call(&self, _exit: &Exit<(), E>) {
        (self.0)()
    }
}

impl<E, F> ExitHook<E> for Exited<F>
where
    F: Fn(&Exit<(), E>) + Send + Sync + 'static,
{
    fn call(&self, exit: &Exit<(), E>) {
        (self.0)(exit)
    }
}

impl<E, F> ExitHook<E> for Interrupted<F>
where
    F: Fn() + Send + Sync + 'static,
{
    fn call(&self, exit: &Exit<(), E>) {
        if matches!(exit, Err(cause) if cause.is_interrupted_only()) {
            (self.0)()
        }
    }
}

impl<E, F> ExitHook<E> for Errored<F>
where
    F: Fn(&Cause<E>) + Send + Sync + 'static,
{
    fn call(&self, exit: &Exit<(), E>) {
        if let Err(cause) = exit {
            if !cause.is_interrupted_only() {
                (self.0)(cause)
            }
        }
    }
}

/// OnExit combinator - runs a hook when a subscription ends.
///
/// Created by [`FxExt::on_exit`](crate::FxExt::on_exit),
/// [`FxExt::ensuring`](crate::FxExt::ensuring),
/// [`FxExt::on_interrupt`](crate::FxExt::on_interrupt) and
/// [`FxExt::on_error`](crate::FxExt::on_error).
///
/// ```rust
/// use undertow::prelude::*;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = calls.clone();
/// let fx = fail::<i32, _>("boom").ensuring(move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// assert!(fx.collect_all().await.is_err());
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// # });
/// ```
pub struct OnExit<Inner, H> {
    pub(crate) inner: Inner,
    pub(crate) hook: Arc<H>,
}

opaque_debug!(OnExit<Inner, H>);

struct Once<H, E> {
    hook: Arc<H>,
    fired: AtomicBool,
    _marker: PhantomData<fn(E)>,
}

impl<H, E> Once<H, E>
where
    H: ExitHook<E>,
{
    fn fire(&self, exit: &Exit<(), E>) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.hook.call(exit);
        }
    }
}

struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> Drop for OnDrop<F> {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f()
        }
    }
}

struct OnExitSink<S, H, E> {
    sink: S,
    once: Arc<Once<H, E>>,
}

impl<A, E, S, H> Sink<A, E> for OnExitSink<S, H, E>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    H: ExitHook<E>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.sink.on_success(value)
    }

    async fn on_failure(&self, cause: Cause<E>) {
        let exit = Err(cause);
        self.once.fire(&exit);
        if let Err(cause) = exit {
            self.sink.on_failure(cause).await
        }
    }
}

impl<Inner, H> Fx for OnExit<Inner, H>
where
    Inner: Fx,
    H: ExitHook<Inner::Error>,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let once = Arc::new(Once {
            hook: Arc::clone(&self.hook),
            fired: AtomicBool::new(false),
            _marker: PhantomData,
        });
        let interrupted = {
            let once = Arc::clone(&once);
            OnDrop(Some(move || {
                once.fire(&Err(Cause::interrupt(FiberId::current())));
            }))
        };
        self.inner
            .run(OnExitSink {
                sink,
                once: Arc::clone(&once),
            })
            .await;
        once.fire(&Ok(()));
        drop(interrupted);
    }
}
