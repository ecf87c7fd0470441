//! Tracing support for producers.
//!
//! [`FxTracingExt::instrument`] runs every subscription of a producer inside
//! a `tracing` span, the same way `tracing::Instrument` does for a single
//! future.

use std::future::Future;

use crate::fx::trait_def::Fx;
use crate::sink::Sink;

/// A producer whose subscriptions run inside a span.
///
/// Created by [`FxTracingExt::instrument`].
#[derive(Debug)]
pub struct Instrument<Inner> {
    pub(crate) inner: Inner,
    pub(crate) span: tracing::Span,
}

impl<Inner: Fx> Fx for Instrument<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        tracing::Instrument::instrument(self.inner.run(sink), self.span.clone())
    }
}

/// Extension trait for adding tracing instrumentation to producers.
pub trait FxTracingExt: Fx {
    /// Run every subscription of this producer inside `span`.
    ///
    /// The span is entered each time the subscription is polled, so events
    /// emitted by sinks and combinators downstream are attributed to it.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let fx = from_iterable::<_, String>(vec![1, 2])
    ///     .instrument(tracing::debug_span!("numbers", source = "static"));
    /// assert_eq!(fx.collect_all().await, Ok(vec![1, 2]));
    /// # });
    /// ```
    fn instrument(self, span: tracing::Span) -> Instrument<Self>
    where
        Self: Sized,
    {
        Instrument { inner: self, span }
    }
}

impl<F: Fx> FxTracingExt for F {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::prelude::*;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn instrument_keeps_values() {
        let fx = from_iterable::<_, String>(vec![1, 2, 3])
            .instrument(tracing::info_span!("test_span"));
        assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn failures_propagate_through_the_span() {
        let fx = fail::<i32, _>("oops".to_string()).instrument(tracing::info_span!("failing"));
        assert_eq!(fx.collect_all().await, Err(Cause::fail("oops".to_string())));
    }

    #[tokio::test]
    #[traced_test]
    async fn events_are_recorded_inside_the_span() {
        let fx = from_iterable::<_, String>(vec![7])
            .tap(|n| tracing::info!(value = *n, "saw value"))
            .instrument(tracing::info_span!("observed"));
        assert_eq!(fx.collect_all().await, Ok(vec![7]));
        assert!(logs_contain("saw value"));
        assert!(logs_contain("observed"));
    }
}
