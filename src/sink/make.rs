//! Closure-backed sinks.

use std::fmt;
use std::future::Future;

use crate::cause::Cause;
use crate::sink::Sink;

/// A sink built from two async closures. Created by [`make`].
pub struct FnSink<S, F> {
    on_success: S,
    on_failure: F,
}

impl<S, F> fmt::Debug for FnSink<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink")
            .field("on_success", &"<function>")
            .field("on_failure", &"<function>")
            .finish()
    }
}

/// Build a sink from an `on_success` and an `on_failure` closure.
pub fn make<A, E, S, SFut, F, FFut>(on_success: S, on_failure: F) -> FnSink<S, F>
where
    S: Fn(A) -> SFut + Send + Sync + 'static,
    SFut: Future<Output = ()> + Send,
    F: Fn(Cause<E>) -> FFut + Send + Sync + 'static,
    FFut: Future<Output = ()> + Send,
{
    FnSink {
        on_success,
        on_failure,
    }
}

impl<A, E, S, SFut, F, FFut> Sink<A, E> for FnSink<S, F>
where
    S: Fn(A) -> SFut + Send + Sync + 'static,
    SFut: Future<Output = ()> + Send,
    F: Fn(Cause<E>) -> FFut + Send + Sync + 'static,
    FFut: Future<Output = ()> + Send,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        (self.on_success)(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        (self.on_failure)(cause)
    }
}

/// A sink that discards everything it receives. Created by [`drain`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Drain;

/// A sink that discards every value and failure.
pub fn drain() -> Drain {
    Drain
}

impl<A, E> Sink<A, E> for Drain
where
    A: Send + 'static,
    E: Send + 'static,
{
    async fn on_success(&self, _value: A) {}

    async fn on_failure(&self, _cause: Cause<E>) {}
}
