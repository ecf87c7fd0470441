//! Fx trait definition.

use std::future::Future;

use crate::sink::Sink;

/// A push-based producer of values.
///
/// An `Fx` is an inert description: nothing happens until [`Fx::run`] is
/// called with a [`Sink`]. Running delivers every outcome through that sink
/// (any number of values, then at most one failure) and returns a future that
/// completes when the producer is exhausted, has failed, or stopped early.
/// Dropping that future cancels the subscription together with any work it
/// forked.
///
/// `run` borrows the producer, so the same `Fx` can be run any number of
/// times with independent sinks. Most producers are cold: every run starts
/// from scratch. Shared producers ([`Subject`](crate::Subject),
/// [`RefSubject`](crate::RefSubject)) let each run observe their live state.
///
/// # Implementing Fx
///
/// Most users never implement `Fx` directly; the constructors in
/// [`crate::fx`] and the combinators of [`FxExt`](crate::FxExt) cover the
/// common cases, and [`make`](crate::fx::make) lifts an arbitrary async
/// function over a sink.
///
/// ```rust
/// use undertow::prelude::*;
///
/// struct Countdown(u32);
///
/// impl Fx for Countdown {
///     type Output = u32;
///     type Error = std::convert::Infallible;
///
///     async fn run<S>(&self, sink: S)
///     where
///         S: Sink<u32, std::convert::Infallible>,
///     {
///         for n in (0..=self.0).rev() {
///             sink.on_success(n).await;
///         }
///     }
/// }
///
/// # tokio_test::block_on(async {
/// assert_eq!(Countdown(3).collect_all().await, Ok(vec![3, 2, 1, 0]));
/// # });
/// ```
pub trait Fx: Send + Sync + 'static {
    /// The type of emitted values.
    type Output: Send + 'static;

    /// The typed failure.
    type Error: Send + 'static;

    /// Subscribe `sink` to this producer.
    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>;
}

impl<F> Fx for std::sync::Arc<F>
where
    F: Fx,
{
    type Output = F::Output;
    type Error = F::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        (**self).run(sink)
    }
}
