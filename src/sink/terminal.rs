//! Once-only termination for sinks.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::cause::Cause;
use crate::scope::ExitSignal;
use crate::sink::Sink;

/// Wraps a downstream sink so that it observes at most one failure and no
/// value after it, whatever the upstream does.
///
/// Terminating (a failure, or [`Terminal::stop`]) fires an [`ExitSignal`]
/// once the downstream has been notified; [`Terminal::drive`] races the
/// upstream against that signal so an infinite upstream is dropped promptly.
pub(crate) struct Terminal<S> {
    sink: S,
    done: AtomicBool,
    signal: ExitSignal,
}

impl<S> Terminal<S> {
    pub(crate) fn new(sink: S) -> Self {
        Terminal {
            sink,
            done: AtomicBool::new(false),
            signal: ExitSignal::new(),
        }
    }

    pub(crate) fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Claim termination. Only the first caller gets `true`.
    fn claim(&self) -> bool {
        !self.done.swap(true, Ordering::SeqCst)
    }

    /// End the subscription voluntarily, without a failure.
    pub(crate) fn stop(&self) {
        self.claim();
        self.signal.fire();
    }

    /// Run `upstream` until it finishes or the subscription terminates.
    pub(crate) async fn drive<F>(&self, upstream: F)
    where
        F: Future<Output = ()>,
    {
        self.signal.race(upstream).await
    }

    /// Forward `value` and then stop; used by combinators that end after a
    /// final value.
    pub(crate) async fn last<A, E>(&self, value: A)
    where
        S: Sink<A, E>,
    {
        if self.claim() {
            self.sink.on_success(value).await;
            self.signal.fire();
        }
    }
}

impl<A, E, S> Sink<A, E> for Terminal<S>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    async fn on_success(&self, value: A) {
        if !self.is_done() {
            self.sink.on_success(value).await;
        }
    }

    async fn on_failure(&self, cause: Cause<E>) {
        if self.claim() {
            self.sink.on_failure(cause).await;
            self.signal.fire();
        }
    }
}
