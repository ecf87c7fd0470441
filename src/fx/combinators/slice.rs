//! Slice combinator - skip a prefix, take a bounded number of values.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cause::Cause;
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

/// Which part of a stream a [`Slice`] keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    /// Number of leading values to drop.
    pub skip: usize,
    /// Maximum number of values to keep after skipping, if bounded.
    pub take: Option<usize>,
}

impl Bounds {
    /// Compose two slices applied one after the other.
    pub fn then(self, next: Bounds) -> Bounds {
        let skip = self.skip.saturating_add(next.skip);
        let remaining = self.take.map(|t| t.saturating_sub(next.skip));
        let take = match (remaining, next.take) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Bounds { skip, take }
    }
}

/// Slice combinator - underlies `skip` and `take`.
///
/// Reaching the `take` bound stops the upstream early: once the last value
/// has been delivered the subscription completes, even if the upstream is
/// infinite.
///
/// Created by [`FxExt::slice`](crate::FxExt::slice),
/// [`FxExt::skip`](crate::FxExt::skip) and [`FxExt::take`](crate::FxExt::take).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(1..).skip(2).take(3);
/// assert_eq!(fx.collect_all().await, Ok(vec![3, 4, 5]));
/// # });
/// ```
#[derive(Debug)]
pub struct Slice<Inner> {
    pub(crate) inner: Inner,
    pub(crate) bounds: Bounds,
}

struct SliceSink<S> {
    sink: Arc<Terminal<S>>,
    bounds: Bounds,
    seen: AtomicUsize,
}

impl<A, E, S> Sink<A, E> for SliceSink<S>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    async fn on_success(&self, value: A) {
        let n = self.seen.fetch_add(1, Ordering::SeqCst);
        let Some(index) = n.checked_sub(self.bounds.skip) else {
            return;
        };
        match self.bounds.take {
            Some(take) if index + 1 == take => self.sink.last(value).await,
            Some(take) if index >= take => {}
            _ => self.sink.on_success(value).await,
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner: Fx> Fx for Slice<Inner> {
    type Output = Inner::Output;
    type Error = Inner::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        if self.bounds.take == Some(0) {
            return;
        }
        let terminal = Arc::new(Terminal::new(sink));
        let adapter = SliceSink {
            sink: Arc::clone(&terminal),
            bounds: self.bounds,
            seen: AtomicUsize::new(0),
        };
        terminal.drive(self.inner.run(adapter)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_compose() {
        let a = Bounds {
            skip: 1,
            take: Some(5),
        };
        let b = Bounds {
            skip: 2,
            take: Some(10),
        };
        assert_eq!(
            a.then(b),
            Bounds {
                skip: 3,
                take: Some(3)
            }
        );
        assert_eq!(
            Bounds { skip: 0, take: None }.then(Bounds {
                skip: 0,
                take: Some(2)
            }),
            Bounds {
                skip: 0,
                take: Some(2)
            }
        );
    }
}
