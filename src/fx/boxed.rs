//! BoxedFx - type-erased producer.
//!
//! Combinators return concrete nested types (`Map<Filter<FromIterable<..>>>`),
//! which keeps them allocation free. Box a producer when the concrete type
//! cannot be named:
//!
//! - storing producers of different shapes in one collection
//! - recursive definitions
//! - returning different producers from match arms
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! fn numbers(doubled: bool) -> BoxedFx<i32, String> {
//!     if doubled {
//!         from_iterable(vec![1, 2]).map(|n| n * 2).boxed()
//!     } else {
//!         from_iterable(vec![1, 2]).boxed()
//!     }
//! }
//!
//! # tokio_test::block_on(async {
//! assert_eq!(numbers(true).collect_all().await, Ok(vec![2, 4]));
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::fx::trait_def::Fx;
use crate::sink::{BoxedSink, Sink};

trait DynFx<A, E>: Send + Sync {
    fn run_boxed(&self, sink: BoxedSink<A, E>) -> BoxFuture<'_, ()>;
}

impl<F> DynFx<F::Output, F::Error> for F
where
    F: Fx,
{
    fn run_boxed(&self, sink: BoxedSink<F::Output, F::Error>) -> BoxFuture<'_, ()> {
        Box::pin(self.run(sink))
    }
}

/// A type-erased, cheaply cloneable [`Fx`].
pub struct BoxedFx<A, E> {
    inner: Arc<dyn DynFx<A, E>>,
}

impl<A, E> BoxedFx<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Erase the type of `fx`.
    pub fn new<F>(fx: F) -> Self
    where
        F: Fx<Output = A, Error = E>,
    {
        BoxedFx {
            inner: Arc::new(fx),
        }
    }
}

impl<A, E> Clone for BoxedFx<A, E> {
    fn clone(&self) -> Self {
        BoxedFx {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, E> fmt::Debug for BoxedFx<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedFx").field("inner", &"<fx>").finish()
    }
}

impl<A, E> Fx for BoxedFx<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    type Output = A;
    type Error = E;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<A, E>,
    {
        self.inner.run_boxed(BoxedSink::new(sink))
    }
}
