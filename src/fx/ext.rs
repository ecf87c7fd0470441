//! Extension trait providing combinator methods for all producers.
//!
//! The `FxExt` trait is automatically implemented for every type that
//! implements [`Fx`]. It provides the transformation, concurrency and
//! runner methods.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cause::{Cause, Exit};
use crate::equivalence::Equivalence;
use crate::fx::boxed::BoxedFx;
use crate::fx::combinators::{
    Always, Bounds, Catch, CatchCause, CatchIf, Causes, ContinueWith, Errored, ExitOf, Exited,
    Filter, FilterEffect, FilterMap, FilterMapEffect, Interrupted, Loop, LoopEffect, Map, MapBoth,
    MapCause, MapEffect, MapError, OnExit, OrElseSucceed, ResultOf, Scan, ScanEffect, SkipRepeats,
    SkipWhile, Slice, StartWith, Stop, TakeWhile, Tap, TapEffect, Until,
};
use crate::fx::concurrency::{
    Combine, ExhaustLatestMap, ExhaustMap, FlatMap, Merge, Retry, SwitchMap,
};
use crate::fx::constructors::{at, sleep, succeed, At, Sleep, Succeed};
use crate::fx::runners::{self, FxFiber};
use crate::fx::trait_def::Fx;
use crate::schedule::{Concurrency, Schedule};
use crate::scope::ScopeHandle;

/// Extension trait providing combinator methods for all producers.
///
/// This trait is automatically implemented for all types that implement
/// [`Fx`]. You don't need to implement it yourself.
///
/// # Example
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(vec![1, 2, 3, 4])
///     .map(|n| n * 2)
///     .filter(|n| *n > 2)
///     .scan(0, |sum, n| sum + n);
///
/// assert_eq!(fx.collect_all().await, Ok(vec![0, 4, 10, 18]));
/// # });
/// ```
pub trait FxExt: Fx {
    // ---- transformation -------------------------------------------------

    /// Transform every value.
    fn map<B, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> B + Send + Sync + 'static,
        B: Send + 'static,
    {
        Map {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Transform every value with an async, fallible function.
    ///
    /// Values are processed one at a time, in order. An `Err` ends the
    /// subscription with that typed failure.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let fx = from_iterable(vec![1, 2, 3]).map_effect(|n| async move {
    ///     if n < 3 { Ok(n * 10) } else { Err("too big") }
    /// });
    /// assert_eq!(fx.collect_all().await, Err(Cause::fail("too big")));
    /// # });
    /// ```
    fn map_effect<B, F, Fut>(self, f: F) -> MapEffect<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, Self::Error>> + Send,
        B: Send + 'static,
    {
        MapEffect {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Keep the values for which `predicate` holds.
    fn filter<P>(self, predicate: P) -> Filter<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        Filter {
            inner: self,
            predicate: Arc::new(predicate),
        }
    }

    /// Filter with an async, fallible predicate.
    fn filter_effect<P, Fut>(self, predicate: P) -> FilterEffect<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, Self::Error>> + Send,
    {
        FilterEffect {
            inner: self,
            predicate: Arc::new(predicate),
        }
    }

    /// Transform and filter in one step: `None` drops the value.
    fn filter_map<B, F>(self, f: F) -> FilterMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> Option<B> + Send + Sync + 'static,
        B: Send + 'static,
    {
        FilterMap {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Async, fallible [`filter_map`](FxExt::filter_map).
    fn filter_map_effect<B, F, Fut>(self, f: F) -> FilterMapEffect<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<B>, Self::Error>> + Send,
        B: Send + 'static,
    {
        FilterMapEffect {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Observe every value without changing it.
    fn tap<F>(self, f: F) -> Tap<Self, F>
    where
        Self: Sized,
        F: Fn(&Self::Output) + Send + Sync + 'static,
    {
        Tap {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Observe every value with an async, fallible function.
    fn tap_effect<F, Fut>(self, f: F) -> TapEffect<Self, F>
    where
        Self: Sized,
        F: Fn(&Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Self::Error>> + Send,
    {
        TapEffect {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Emit `seed`, then the running accumulation after every value.
    fn scan<B, F>(self, seed: B, f: F) -> Scan<Self, B, F>
    where
        Self: Sized,
        B: Clone + Send + Sync + 'static,
        F: Fn(B, Self::Output) -> B + Send + Sync + 'static,
    {
        Scan {
            inner: self,
            seed,
            f: Arc::new(f),
        }
    }

    /// [`scan`](FxExt::scan) with an async, fallible reducer. On failure the
    /// accumulated state is kept and the failure forwarded.
    fn scan_effect<B, F, Fut>(self, seed: B, f: F) -> ScanEffect<Self, B, F>
    where
        Self: Sized,
        B: Clone + Send + Sync + 'static,
        F: Fn(B, Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, Self::Error>> + Send,
    {
        ScanEffect {
            inner: self,
            seed,
            f: Arc::new(f),
        }
    }

    /// Thread a state through the stream, emitting one output per value.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let fx = from_iterable::<_, String>(vec!["a", "b", "c"])
    ///     .loop_with(1, |n, s| (format!("{n}:{s}"), n + 1));
    /// assert_eq!(
    ///     fx.collect_all().await,
    ///     Ok(vec!["1:a".to_string(), "2:b".to_string(), "3:c".to_string()])
    /// );
    /// # });
    /// ```
    fn loop_with<St, B, F>(self, seed: St, f: F) -> Loop<Self, St, F>
    where
        Self: Sized,
        St: Clone + Send + Sync + 'static,
        F: Fn(St, Self::Output) -> (B, St) + Send + Sync + 'static,
        B: Send + 'static,
    {
        Loop {
            inner: self,
            seed,
            f: Arc::new(f),
        }
    }

    /// [`loop_with`](FxExt::loop_with) with an async, fallible step.
    fn loop_effect<St, B, F, Fut>(self, seed: St, f: F) -> LoopEffect<Self, St, F>
    where
        Self: Sized,
        St: Clone + Send + Sync + 'static,
        F: Fn(St, Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(B, St), Self::Error>> + Send,
        B: Send + 'static,
    {
        LoopEffect {
            inner: self,
            seed,
            f: Arc::new(f),
        }
    }

    /// Drop values equal to the one just before them.
    fn skip_repeats(self) -> SkipRepeats<Self, Self::Output>
    where
        Self: Sized,
        Self::Output: Clone + PartialEq,
    {
        self.skip_repeats_with(Equivalence::strict())
    }

    /// Drop values that `eq` judges equivalent to the one just before them.
    fn skip_repeats_with(self, eq: Equivalence<Self::Output>) -> SkipRepeats<Self, Self::Output>
    where
        Self: Sized,
        Self::Output: Clone,
    {
        SkipRepeats { inner: self, eq }
    }

    /// Skip the first `skip` values and keep at most `take` of the rest.
    fn slice(self, bounds: Bounds) -> Slice<Self>
    where
        Self: Sized,
    {
        Slice {
            inner: self,
            bounds,
        }
    }

    /// Drop the first `n` values.
    fn skip(self, n: usize) -> Slice<Self>
    where
        Self: Sized,
    {
        self.slice(Bounds {
            skip: n,
            take: None,
        })
    }

    /// Keep the first `n` values, then stop the upstream.
    fn take(self, n: usize) -> Slice<Self>
    where
        Self: Sized,
    {
        self.slice(Bounds {
            skip: 0,
            take: Some(n),
        })
    }

    /// Keep values while `predicate` holds; stop at the first that fails it.
    fn take_while<P>(self, predicate: P) -> TakeWhile<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        TakeWhile {
            inner: self,
            predicate: Arc::new(predicate),
            stop: Stop::While,
        }
    }

    /// Keep values until one matches `predicate`; the match is not emitted.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let fx = from_iterable::<_, String>(1..).take_until(|n| *n == 4);
    /// assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 3]));
    /// # });
    /// ```
    fn take_until<P>(self, predicate: P) -> TakeWhile<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        TakeWhile {
            inner: self,
            predicate: Arc::new(predicate),
            stop: Stop::Until,
        }
    }

    /// Keep values up to and including the first that matches `predicate`.
    fn drop_after<P>(self, predicate: P) -> TakeWhile<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        TakeWhile {
            inner: self,
            predicate: Arc::new(predicate),
            stop: Stop::After,
        }
    }

    /// Drop values while `predicate` holds, then forward everything.
    fn skip_while<P>(self, predicate: P) -> SkipWhile<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        SkipWhile {
            inner: self,
            predicate: Arc::new(predicate),
            skip_on: true,
        }
    }

    /// Drop values until one matches `predicate`, then forward everything,
    /// the match included.
    fn skip_until<P>(self, predicate: P) -> SkipWhile<Self, P>
    where
        Self: Sized,
        P: Fn(&Self::Output) -> bool + Send + Sync + 'static,
    {
        SkipWhile {
            inner: self,
            predicate: Arc::new(predicate),
            skip_on: false,
        }
    }

    /// Stop as soon as `signal` emits.
    fn until<X>(self, signal: X) -> Until<Self, X>
    where
        Self: Sized,
        X: Fx<Error = Self::Error>,
    {
        Until {
            inner: self,
            signal,
        }
    }

    /// Emit `value` before the first upstream value.
    fn start_with(self, value: Self::Output) -> StartWith<Self, Self::Output>
    where
        Self: Sized,
        Self::Output: Clone + Sync,
    {
        StartWith { inner: self, value }
    }

    /// Run `next` once this producer completes successfully.
    fn continue_with<X>(self, next: X) -> ContinueWith<Self, X>
    where
        Self: Sized,
        X: Fx<Output = Self::Output, Error = Self::Error>,
    {
        ContinueWith {
            first: self,
            second: next,
        }
    }

    // ---- failure channel ------------------------------------------------

    /// Emit the outcome as values: every value as `Ok`, the failure as a
    /// final `Err`. The result never fails.
    fn exit(self) -> ExitOf<Self>
    where
        Self: Sized,
    {
        ExitOf { inner: self }
    }

    /// Emit values as `Ok` and a typed failure as a final `Err`. Defects and
    /// interruptions stay failures.
    fn result(self) -> ResultOf<Self>
    where
        Self: Sized,
    {
        ResultOf { inner: self }
    }

    /// Drop every value and emit the failure, if any, as the only value.
    fn causes(self) -> Causes<Self>
    where
        Self: Sized,
    {
        Causes { inner: self }
    }

    /// Transform the typed failure. Defects and interruptions pass through
    /// untouched.
    fn map_error<E2, F>(self, f: F) -> MapError<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Error) -> E2 + Send + Sync + 'static,
        E2: Send + 'static,
    {
        MapError {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Transform the whole failure cause.
    fn map_cause<E2, F>(self, f: F) -> MapCause<Self, F>
    where
        Self: Sized,
        F: Fn(Cause<Self::Error>) -> Cause<E2> + Send + Sync + 'static,
        E2: Send + 'static,
    {
        MapCause {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Transform typed failures and values at once.
    fn map_both<B, E2, F, G>(self, on_error: F, on_value: G) -> MapBoth<Self, F, G>
    where
        Self: Sized,
        F: Fn(Self::Error) -> E2 + Send + Sync + 'static,
        G: Fn(Self::Output) -> B + Send + Sync + 'static,
        B: Send + 'static,
        E2: Send + 'static,
    {
        MapBoth {
            inner: self,
            on_error: Arc::new(on_error),
            on_value: Arc::new(on_value),
        }
    }

    /// Recover from a typed failure by switching to another producer.
    ///
    /// Defects and interruptions are not caught.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let fx = fail::<i32, _>("boom").catch(|_| succeed::<_, String>(0));
    /// assert_eq!(fx.collect_all().await, Ok(vec![0]));
    ///
    /// let fx = die::<i32, &str>("bug").catch(|_| succeed::<_, String>(0));
    /// assert!(fx.collect_all().await.unwrap_err().is_die());
    /// # });
    /// ```
    fn catch<X, F>(self, f: F) -> Catch<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Error) -> X + Send + Sync + 'static,
        X: Fx<Output = Self::Output>,
    {
        Catch {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Recover from the typed failures matching `predicate`.
    fn catch_if<X, P, F>(self, predicate: P, f: F) -> CatchIf<Self, P, F>
    where
        Self: Sized,
        P: Fn(&Self::Error) -> bool + Send + Sync + 'static,
        F: Fn(Self::Error) -> X + Send + Sync + 'static,
        X: Fx<Output = Self::Output, Error = Self::Error>,
    {
        CatchIf {
            inner: self,
            predicate: Arc::new(predicate),
            f: Arc::new(f),
        }
    }

    /// Recover from any failure, defects and interruptions included.
    fn catch_cause<X, F>(self, f: F) -> CatchCause<Self, F>
    where
        Self: Sized,
        F: Fn(Cause<Self::Error>) -> X + Send + Sync + 'static,
        X: Fx<Output = Self::Output>,
    {
        CatchCause {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Replace a typed failure with a final value.
    fn or_else_succeed<F>(self, f: F) -> OrElseSucceed<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Error) -> Self::Output + Send + Sync + 'static,
    {
        OrElseSucceed {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Re-subscribe after a typed failure while `schedule` allows.
    fn retry(self, schedule: Schedule) -> Retry<Self>
    where
        Self: Sized,
    {
        Retry {
            inner: self,
            schedule,
        }
    }

    // ---- lifecycle hooks ------------------------------------------------

    /// Run `f` once when the subscription ends, however it ends.
    fn ensuring<F>(self, f: F) -> OnExit<Self, Always<F>>
    where
        Self: Sized,
        F: Fn() + Send + Sync + 'static,
    {
        OnExit {
            inner: self,
            hook: Arc::new(Always(f)),
        }
    }

    /// Run `f` once with the outcome of the subscription.
    fn on_exit<F>(self, f: F) -> OnExit<Self, Exited<F>>
    where
        Self: Sized,
        F: Fn(&Exit<(), Self::Error>) + Send + Sync + 'static,
    {
        OnExit {
            inner: self,
            hook: Arc::new(Exited(f)),
        }
    }

    /// Run `f` once if the subscription is interrupted.
    fn on_interrupt<F>(self, f: F) -> OnExit<Self, Interrupted<F>>
    where
        Self: Sized,
        F: Fn() + Send + Sync + 'static,
    {
        OnExit {
            inner: self,
            hook: Arc::new(Interrupted(f)),
        }
    }

    /// Run `f` once if the subscription fails with anything but an
    /// interruption.
    fn on_error<F>(self, f: F) -> OnExit<Self, Errored<F>>
    where
        Self: Sized,
        F: Fn(&Cause<Self::Error>) + Send + Sync + 'static,
    {
        OnExit {
            inner: self,
            hook: Arc::new(Errored(f)),
        }
    }

    // ---- concurrency ----------------------------------------------------

    /// Map every value to a producer and run all of them concurrently.
    fn flat_map<X, F>(self, f: F) -> FlatMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> X + Send + Sync + 'static,
        X: Fx<Error = Self::Error>,
    {
        self.flat_map_with(f, Concurrency::Unbounded)
    }

    /// [`flat_map`](FxExt::flat_map) with at most `n` inner producers at
    /// once. Upstream values wait for a free slot.
    fn flat_map_concurrently<X, F>(self, f: F, n: usize) -> FlatMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> X + Send + Sync + 'static,
        X: Fx<Error = Self::Error>,
    {
        self.flat_map_with(f, Concurrency::bounded(n))
    }

    /// [`flat_map`](FxExt::flat_map) with an explicit [`Concurrency`].
    fn flat_map_with<X, F>(self, f: F, concurrency: Concurrency) -> FlatMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> X + Send + Sync + 'static,
        X: Fx<Error = Self::Error>,
    {
        FlatMap {
            inner: self,
            f: Arc::new(f),
            concurrency,
        }
    }

    /// Map every value to a producer, interrupting the previous one.
    fn switch_map<X, F>(self, f: F) -> SwitchMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> X + Send + Sync + 'static,
        X: Fx<Error = Self::Error>,
    {
        SwitchMap {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Map every value to a producer, dropping values that arrive while one
    /// is running.
    fn exhaust_map<X, F>(self, f: F) -> ExhaustMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> X + Send + Sync + 'static,
        X: Fx<Error = Self::Error>,
    {
        ExhaustMap {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Map every value to a producer; while one runs, keep only the newest
    /// value and run it next.
    fn exhaust_latest_map<X, F>(self, f: F) -> ExhaustLatestMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> X + Send + Sync + 'static,
        X: Fx<Error = Self::Error>,
    {
        ExhaustLatestMap {
            inner: self,
            f: Arc::new(f),
        }
    }

    /// Run this producer and `other` concurrently into one stream.
    fn merge<X>(self, other: X) -> Merge<Self, X>
    where
        Self: Sized,
        X: Fx<Output = Self::Output, Error = Self::Error>,
    {
        Merge {
            left: Arc::new(self),
            right: Arc::new(other),
        }
    }

    /// Pair the latest values of this producer and `other`.
    fn combine<X>(self, other: X) -> Combine<(Self, X)>
    where
        Self: Sized,
        Self::Output: Clone,
        X: Fx<Error = Self::Error>,
        X::Output: Clone,
    {
        Combine {
            sources: Arc::new((self, other)),
        }
    }

    /// Emit a value only after `quiet` has passed without a newer one.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let fx = from_iterable::<_, String>(vec![1, 2, 3]).debounce(Duration::from_millis(5));
    /// assert_eq!(fx.collect_all().await, Ok(vec![3]));
    /// # });
    /// ```
    fn debounce(
        self,
        quiet: Duration,
    ) -> SwitchMap<Self, impl Fn(Self::Output) -> At<Self::Output, Self::Error> + Send + Sync + 'static>
    where
        Self: Sized,
        Self::Output: Clone + Sync,
    {
        self.switch_map(move |value| at::<_, Self::Error>(value, quiet))
    }

    /// Emit a value, then ignore the upstream for `window`.
    fn throttle(
        self,
        window: Duration,
    ) -> ExhaustMap<
        Self,
        impl Fn(Self::Output) -> ContinueWith<Succeed<Self::Output, Self::Error>, Sleep<Self::Output, Self::Error>>
            + Send
            + Sync
            + 'static,
    >
    where
        Self: Sized,
        Self::Output: Clone + Sync,
    {
        self.exhaust_map(move |value| succeed::<_, Self::Error>(value).continue_with(sleep(window)))
    }

    /// Emit a value, then hold the newest value of the next `window` and
    /// emit it once the window has passed.
    fn throttle_latest(
        self,
        window: Duration,
    ) -> ExhaustLatestMap<
        Self,
        impl Fn(Self::Output) -> ContinueWith<Succeed<Self::Output, Self::Error>, Sleep<Self::Output, Self::Error>>
            + Send
            + Sync
            + 'static,
    >
    where
        Self: Sized,
        Self::Output: Clone + Sync,
    {
        self.exhaust_latest_map(move |value| {
            succeed::<_, Self::Error>(value).continue_with(sleep(window))
        })
    }

    /// Hold every value for `delay` before forwarding it. Order is kept.
    fn delay(
        self,
        delay: Duration,
    ) -> FlatMap<Self, impl Fn(Self::Output) -> At<Self::Output, Self::Error> + Send + Sync + 'static>
    where
        Self: Sized,
        Self::Output: Clone + Sync,
    {
        self.flat_map_concurrently(move |value| at::<_, Self::Error>(value, delay), 1)
    }

    // ---- boxing ---------------------------------------------------------

    /// Erase the type of this producer.
    fn boxed(self) -> BoxedFx<Self::Output, Self::Error>
    where
        Self: Sized,
    {
        BoxedFx::new(self)
    }

    // ---- runners --------------------------------------------------------

    /// Run to completion and collect every value.
    ///
    /// The first failure is returned instead of the values.
    fn collect_all(&self) -> impl Future<Output = Exit<Vec<Self::Output>, Self::Error>> + Send
    where
        Self: Sized,
    {
        runners::collect_all(self)
    }

    /// Run to completion for effects only.
    fn drain(&self) -> impl Future<Output = Exit<(), Self::Error>> + Send
    where
        Self: Sized,
    {
        runners::drain(self)
    }

    /// Run until the first value and return it; `None` when the producer
    /// completes without emitting.
    fn first(&self) -> impl Future<Output = Exit<Option<Self::Output>, Self::Error>> + Send
    where
        Self: Sized,
    {
        runners::first(self)
    }

    /// Run to completion, feeding every value to an async, fallible
    /// observer. An `Err` from the observer ends the run.
    fn observe<F, Fut>(&self, f: F) -> impl Future<Output = Exit<(), Self::Error>> + Send
    where
        Self: Sized,
        F: Fn(Self::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Self::Error>> + Send,
    {
        runners::observe(self, f)
    }

    /// Drain on a fiber forked into `scope`.
    fn fork(self, scope: &impl AsRef<ScopeHandle>) -> FxFiber<Self::Error>
    where
        Self: Sized,
    {
        FxFiber::spawn(self, scope.as_ref())
    }

    /// Drain on a detached fiber that is only stopped by
    /// [`FxFiber::interrupt`] or by completing.
    fn run_fork(self) -> FxFiber<Self::Error>
    where
        Self: Sized,
    {
        FxFiber::detached(self)
    }
}

impl<F: Fx> FxExt for F {}

