//! Push-based producers.
//!
//! An [`Fx`] is an inert description of a stream of values. Running it with a
//! [`Sink`](crate::Sink) pushes every value into the sink, followed by at most
//! one failure, and the returned future completes when the stream is done.
//!
//! # Zero-cost by default
//!
//! Combinators return concrete nested types, so a pipeline like
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let fx = from_iterable::<_, String>(1..=10)
//!     .filter(|n| n % 2 == 0)
//!     .map(|n| n * 10)
//!     .take(3);
//!
//! assert_eq!(fx.collect_all().await, Ok(vec![20, 40, 60]));
//! # });
//! ```
//!
//! has the type `Slice<Map<Filter<FromIterable<..>, _>, _>>` and allocates
//! nothing per value. Use [`FxExt::boxed`] when a type has to be erased.
//!
//! # Failures
//!
//! The failure channel carries a [`Cause`](crate::Cause): a typed failure, a
//! defect or an interruption. Combinators that recover from errors
//! ([`FxExt::catch`], [`FxExt::catch_if`]) only see typed failures;
//! [`FxExt::catch_cause`] sees everything. [`FxExt::exit`] and
//! [`FxExt::result`] turn the failure channel into ordinary values.
//!
//! # Concurrency
//!
//! The combinators in [`concurrency`] fork work into a scope owned by the
//! subscription. See that module for the overlap policies.

macro_rules! opaque_debug {
    ($name:ident < $($param:ident),* >) => {
        impl<$($param),*> std::fmt::Debug for $name<$($param),*> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name)).finish_non_exhaustive()
            }
        }
    };
}

pub mod boxed;
pub mod combinators;
pub mod concurrency;
pub mod constructors;
pub mod ext;
pub mod prelude;
pub mod runners;
pub mod tracing;
mod trait_def;

use std::sync::Arc;

pub use trait_def::Fx;

pub use ext::FxExt;

pub use boxed::BoxedFx;

pub use combinators::{
    Always, Bounds, Catch, CatchCause, CatchIf, Causes, ContinueWith, Errored, ExitHook, ExitOf,
    Exited, Filter, FilterEffect, FilterMap, FilterMapEffect, Interrupted, Loop, LoopEffect, Map,
    MapBoth, MapCause, MapEffect, MapError, OnExit, OrElseSucceed, ResultOf, Scan, ScanEffect,
    SkipRepeats, SkipWhile, Slice, StartWith, TakeWhile, Tap, TapEffect, Until,
};

pub use concurrency::{
    Combine, CombineAll, ExhaustLatestMap, ExhaustMap, FlatMap, Merge, MergeAll, Retry, StructOf,
    SwitchMap,
};

pub use constructors::{
    at, die, empty, fail, fail_cause, from_effect, from_exit, from_future, from_iterable,
    from_schedule, make, never, periodic, sleep, succeed, suspend, unwrap, unwrap_scoped, At,
    Empty, FailCause, FromEffect, FromExit, FromFuture, FromIterable, FromSchedule, Make, Never,
    Sleep, Succeed, Suspend, Unwrap, UnwrapScoped,
};

pub use runners::FxFiber;

pub use self::tracing::{FxTracingExt, Instrument};

/// Run every producer of `branches` concurrently into one sink.
///
/// See [`MergeAll`] for the failure policy.
pub fn merge_all<X: Fx>(branches: impl IntoIterator<Item = X>) -> MergeAll<X> {
    MergeAll {
        branches: Arc::new(branches.into_iter().collect()),
    }
}

/// Combine a tuple of two to four producers into a stream of tuples of their
/// latest values.
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = combine((
///     succeed::<_, String>(1),
///     succeed(2.5),
///     succeed("three"),
/// ));
/// assert_eq!(fx.collect_all().await, Ok(vec![(1, 2.5, "three")]));
/// # });
/// ```
pub fn combine<T>(sources: T) -> Combine<T>
where
    Combine<T>: Fx,
{
    Combine {
        sources: Arc::new(sources),
    }
}

/// Combine producers of one type into a stream of vectors of their latest
/// values, in input order.
pub fn combine_all<X>(sources: impl IntoIterator<Item = X>) -> CombineAll<X>
where
    X: Fx,
    X::Output: Clone,
{
    CombineAll {
        sources: Arc::new(sources.into_iter().collect()),
    }
}

/// Combine keyed producers into a stream of maps of their latest values.
pub fn struct_of<K, X>(sources: impl IntoIterator<Item = (K, X)>) -> StructOf<K, X>
where
    K: Ord + Clone + Send + Sync + 'static,
    X: Fx,
    X::Output: Clone,
{
    let (keys, sources): (Vec<K>, Vec<X>) = sources.into_iter().unzip();
    StructOf {
        keys: Arc::new(keys),
        sources: Arc::new(sources),
    }
}

#[cfg(test)]
mod tests;
