//! BoxedSink - type-erased sink.
//!
//! Use `BoxedSink` when sinks of different concrete types must live in one
//! collection (the subscriber list of a [`Subject`](crate::Subject)) or cross
//! an object-safe boundary ([`BoxedFx`](crate::BoxedFx)).

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::cause::Cause;
use crate::sink::Sink;

trait DynSink<A, E>: Send + Sync {
    fn on_success_boxed(&self, value: A) -> BoxFuture<'_, ()>;
    fn on_failure_boxed(&self, cause: Cause<E>) -> BoxFuture<'_, ()>;
}

impl<A, E, S> DynSink<A, E> for S
where
    A: 'static,
    E: 'static,
    S: Sink<A, E>,
{
    fn on_success_boxed(&self, value: A) -> BoxFuture<'_, ()> {
        Box::pin(self.on_success(value))
    }

    fn on_failure_boxed(&self, cause: Cause<E>) -> BoxFuture<'_, ()> {
        Box::pin(self.on_failure(cause))
    }
}

/// A type-erased, cheaply cloneable [`Sink`].
pub struct BoxedSink<A, E> {
    inner: Arc<dyn DynSink<A, E>>,
}

impl<A, E> BoxedSink<A, E>
where
    A: 'static,
    E: 'static,
{
    /// Erase the type of `sink`.
    pub fn new<S>(sink: S) -> Self
    where
        S: Sink<A, E>,
    {
        BoxedSink {
            inner: Arc::new(sink),
        }
    }
}

impl<A, E> Clone for BoxedSink<A, E> {
    fn clone(&self) -> Self {
        BoxedSink {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, E> BoxedSink<A, E> {
    /// Returns `true` when both handles point to the same sink.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<A, E> fmt::Debug for BoxedSink<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedSink")
            .field("inner", &"<sink>")
            .finish()
    }
}

impl<A, E> Sink<A, E> for BoxedSink<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.inner.on_success_boxed(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.inner.on_failure_boxed(cause)
    }
}
