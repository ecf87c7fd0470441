//! Sink trait definition.

use std::future::Future;
use std::sync::Arc;

use crate::cause::Cause;

/// The consumer of a stream's notifications.
///
/// # Contract
///
/// - `on_success` may be called any number of times.
/// - `on_failure` is called at most once per subscription, and nothing is
///   delivered after it.
/// - A sink performs its outward effects only from these two entry points.
///
/// Both callbacks are asynchronous: a slow sink back-pressures the producer
/// that is feeding it.
///
/// Sinks are shared between the fibers of a subscription, hence the
/// `Send + Sync + 'static` bound; stateful sinks use interior mutability.
pub trait Sink<A, E>: Send + Sync + 'static {
    /// Receive one value.
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send;

    /// Receive the terminal failure of the subscription.
    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send;
}

impl<A, E, S> Sink<A, E> for Arc<S>
where
    S: Sink<A, E>,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        (**self).on_success(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        (**self).on_failure(cause)
    }
}
