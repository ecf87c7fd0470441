//! RefSubject - a reactive state cell.
//!
//! A [`RefSubject`] pairs a [`DeferredRef`] holding the current value with a
//! [`Subject`] broadcasting changes. Reads return the current value, waiting
//! while the cell is empty. Writes store the new value and push it to every
//! subscriber, but only when it differs from the current one under the
//! cell's [`Equivalence`].
//!
//! Run as an [`Fx`], a ref emits its current value (if any) and then every
//! changed value.
//!
//! # Module Structure
//!
//! - [`RefSubject`] - the cell and its read/write operations
//! - [`Computed`] - a read-only cell derived with [`RefSubject::computed`]
//! - [`Transaction`] - the view handed to [`RefSubject::run_updates`]
//! - [`RefBool`], [`RefNumber`], [`RefVec`], [`RefOption`], [`RefHashMap`] -
//!   cells with operations specific to their value type
//!
//! # Example
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let count = RefSubject::<i32>::of(0);
//! let changes = tokio::spawn({
//!     let count = count.clone();
//!     async move { count.take(3).collect_all().await }
//! });
//! tokio::task::yield_now().await;
//!
//! count.set(1).await;
//! count.set(1).await;
//! count.update(|n| n + 1).await.unwrap();
//!
//! assert_eq!(changes.await.unwrap(), Ok(vec![0, 1, 2]));
//! assert_eq!(count.version(), 3);
//! # });
//! ```

mod computed;
mod helpers;

pub use computed::Computed;
pub use helpers::{RefBool, RefHashMap, RefNumber, RefOption, RefVec};

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::{Mutex, MutexGuard};

use crate::cause::{Cause, Exit, FiberId};
use crate::deferred_ref::DeferredRef;
use crate::equivalence::Equivalence;
use crate::fx::Fx;
use crate::scope::ScopeHandle;
use crate::sink::Sink;
use crate::subject::Subject;

type Initializer<A, E> = Arc<dyn Fn() -> BoxFuture<'static, Exit<A, E>> + Send + Sync>;

/// A versioned, deduplicating, observable state cell.
///
/// Cloning is cheap; clones share the same state.
///
/// Writes are serialized. Writing to a ref from inside one of its own
/// subscribers deadlocks; fork the write instead.
pub struct RefSubject<A, E = Infallible> {
    inner: Arc<Inner<A, E>>,
}

struct Inner<A, E> {
    deferred: DeferredRef<A, E>,
    subject: Subject<A, E>,
    eq: Equivalence<A>,
    updates: Mutex<()>,
    init: Option<Initializer<A, E>>,
}

impl<A, E> Clone for RefSubject<A, E> {
    fn clone(&self) -> Self {
        RefSubject {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, E> fmt::Debug for RefSubject<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefSubject")
            .field("deferred", &self.inner.deferred)
            .field("subject", &self.inner.subject)
            .field("lazy", &self.inner.init.is_some())
            .finish()
    }
}

impl<A, E> RefSubject<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn build(eq: Equivalence<A>, init: Option<Initializer<A, E>>) -> Self {
        RefSubject {
            inner: Arc::new(Inner {
                deferred: DeferredRef::new(Equivalence::exit(eq.clone())),
                subject: Subject::replay(1),
                eq,
                updates: Mutex::new(()),
                init,
            }),
        }
    }

    /// A cell holding `value`, comparing values with `==`.
    pub fn of(value: A) -> Self
    where
        A: PartialEq,
    {
        Self::with_equivalence(value, Equivalence::strict())
    }

    /// A cell holding `value`, comparing values with `eq`.
    pub fn with_equivalence(value: A, eq: Equivalence<A>) -> Self {
        let cell = Self::build(eq, None);
        cell.inner.deferred.done(Ok(value.clone()));
        cell.inner.subject.seed(value);
        cell
    }

    /// A cell whose value is computed by `f` on first read.
    ///
    /// After [`RefSubject::reset`], the next read runs `f` again.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// # tokio_test::block_on(async {
    /// let runs = Arc::new(AtomicUsize::new(0));
    /// let counter = runs.clone();
    /// let cell = RefSubject::<usize, String>::from_effect(move || {
    ///     let n = counter.fetch_add(1, Ordering::SeqCst);
    ///     async move { Ok(n * 10) }
    /// });
    ///
    /// assert_eq!(runs.load(Ordering::SeqCst), 0);
    /// assert_eq!(cell.get().await, Ok(0));
    /// assert_eq!(cell.get().await, Ok(0));
    ///
    /// cell.reset().await;
    /// assert_eq!(cell.get().await, Ok(10));
    /// # });
    /// ```
    pub fn from_effect<F, Fut>(f: F) -> Self
    where
        A: PartialEq,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, E>> + Send + 'static,
    {
        Self::from_effect_with(f, Equivalence::strict())
    }

    /// [`RefSubject::from_effect`] with a custom equivalence.
    pub fn from_effect_with<F, Fut>(f: F, eq: Equivalence<A>) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<A, E>> + Send + 'static,
    {
        let init: Initializer<A, E> = Arc::new(move || -> BoxFuture<'static, Exit<A, E>> {
            let fut = f();
            Box::pin(async move { fut.await.map_err(Cause::fail) })
        });
        Self::build(eq, Some(init))
    }

    /// A cell following the values of `fx`.
    ///
    /// `fx` runs on a fiber of `scope`. The cell is empty until `fx` emits.
    /// A failure of `fx` is stored in the cell. Closing the scope stops `fx`
    /// and interrupts reads still waiting for a first value.
    pub fn from_fx<X>(fx: X, scope: &impl AsRef<ScopeHandle>) -> Self
    where
        A: PartialEq,
        X: Fx<Output = A, Error = E>,
    {
        let cell = Self::build(Equivalence::strict(), None);
        let scope = scope.as_ref();

        let writer = Writer { cell: cell.clone() };
        let fiber = scope.fork(async move { fx.run(writer).await });
        tracing::debug!(fiber = %fiber.id(), "ref following producer");

        let deferred = cell.inner.deferred.clone();
        scope.add_finalizer(move || deferred.interrupt());
        cell
    }

    /// The current value, waiting while the cell is empty.
    pub async fn get(&self) -> Exit<A, E> {
        if let Some(exit) = self.inner.deferred.current() {
            return exit;
        }
        self.acquire().await.1
    }

    /// Store `value`, notifying subscribers if it changed.
    pub async fn set(&self, value: A) -> A {
        let _guard = self.inner.updates.lock().await;
        self.publish(Ok(value.clone())).await;
        value
    }

    /// Replace the current value with `f(current)`.
    pub async fn update<F>(&self, f: F) -> Exit<A, E>
    where
        F: FnOnce(A) -> A,
    {
        let (_guard, current) = self.acquire().await;
        let next = f(current?);
        self.publish(Ok(next.clone())).await;
        Ok(next)
    }

    /// Replace the current value with the result of an async `f`.
    ///
    /// A failure of `f` leaves the cell unchanged.
    pub async fn update_effect<F, Fut>(&self, f: F) -> Exit<A, E>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<A, E>>,
    {
        let (_guard, current) = self.acquire().await;
        let next = f(current?).await.map_err(Cause::fail)?;
        self.publish(Ok(next.clone())).await;
        Ok(next)
    }

    /// Compute a result and a new value from the current one.
    pub async fn modify<B, F>(&self, f: F) -> Exit<B, E>
    where
        F: FnOnce(A) -> (B, A),
    {
        let (_guard, current) = self.acquire().await;
        let (out, next) = f(current?);
        self.publish(Ok(next)).await;
        Ok(out)
    }

    /// Async [`RefSubject::modify`]; a failure of `f` leaves the cell
    /// unchanged.
    pub async fn modify_effect<B, F, Fut>(&self, f: F) -> Exit<B, E>
    where
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<(B, A), E>>,
    {
        let (_guard, current) = self.acquire().await;
        let (out, next) = f(current?).await.map_err(Cause::fail)?;
        self.publish(Ok(next)).await;
        Ok(out)
    }

    /// Run several reads and writes as one update.
    ///
    /// Other writers wait until `f` has finished.
    ///
    /// ```rust
    /// use undertow::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let balance = RefSubject::<i32, String>::of(100);
    /// let paid = balance
    ///     .run_updates(|tx| async move {
    ///         let current = tx.get().map_err(|cause| cause.squash())?;
    ///         if current < 30 {
    ///             return Err("insufficient".to_string());
    ///         }
    ///         tx.set(current - 30).await;
    ///         Ok(30)
    ///     })
    ///     .await;
    ///
    /// assert_eq!(paid, Ok(30));
    /// assert_eq!(balance.get().await, Ok(70));
    /// # });
    /// ```
    pub async fn run_updates<B, F, Fut>(&self, f: F) -> Exit<B, E>
    where
        F: FnOnce(Transaction<A, E>) -> Fut,
        Fut: Future<Output = Result<B, E>>,
    {
        let (_guard, _) = self.acquire().await;
        f(Transaction { cell: self.clone() })
            .await
            .map_err(Cause::fail)
    }

    /// Empty the cell and return what it held.
    ///
    /// Pending reads are interrupted. A lazy cell recomputes its value on the
    /// next read.
    pub async fn reset(&self) -> Option<Exit<A, E>> {
        let _guard = self.inner.updates.lock().await;
        self.inner.subject.forget();
        self.inner.deferred.reset()
    }

    /// Number of effective writes so far.
    pub fn version(&self) -> u64 {
        self.inner.deferred.version()
    }

    /// Interrupt pending reads and every subscription.
    pub async fn interrupt(&self) {
        self.inner.deferred.interrupt();
        self.inner.subject.interrupt().await;
    }

    /// End every subscription successfully.
    pub fn complete(&self) {
        self.inner.subject.complete();
    }

    /// Number of attached subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subject.subscriber_count()
    }

    /// The equivalence used to detect changes.
    pub fn equivalence(&self) -> &Equivalence<A> {
        &self.inner.eq
    }

    /// Take the write lock together with the current exit, running the lazy
    /// initializer or waiting for a first value if the cell is empty.
    async fn acquire(&self) -> (MutexGuard<'_, ()>, Exit<A, E>) {
        loop {
            let guard = self.inner.updates.lock().await;
            if let Some(exit) = self.inner.deferred.current() {
                return (guard, exit);
            }
            if let Some(init) = &self.inner.init {
                tracing::trace!("initializing lazy ref");
                let exit = init().await;
                self.publish(exit.clone()).await;
                return (guard, exit);
            }
            drop(guard);

            if let Err(cause) = self.inner.deferred.get().await {
                if !self.inner.deferred.is_set() {
                    return (self.inner.updates.lock().await, Err(cause));
                }
            }
        }
    }

    /// Store `exit` and broadcast it if it changed. Callers hold the write
    /// lock.
    async fn publish(&self, exit: Exit<A, E>) -> bool {
        if !self.inner.deferred.done(exit.clone()) {
            return false;
        }
        match exit {
            Ok(value) => self.inner.subject.on_success(value).await,
            Err(cause) => self.inner.subject.on_failure(cause).await,
        }
        true
    }
}

/// Read/write access to a [`RefSubject`] inside
/// [`RefSubject::run_updates`].
pub struct Transaction<A, E> {
    cell: RefSubject<A, E>,
}

impl<A, E> fmt::Debug for Transaction<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction").field("cell", &self.cell).finish()
    }
}

impl<A, E> Transaction<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// The current value.
    pub fn get(&self) -> Exit<A, E> {
        self.cell
            .inner
            .deferred
            .current()
            .unwrap_or_else(|| Err(Cause::interrupt(FiberId::current())))
    }

    /// Store `value`, notifying subscribers if it changed.
    pub async fn set(&self, value: A) -> A {
        self.cell.publish(Ok(value.clone())).await;
        value
    }

    /// Replace the current value with `f(current)`.
    pub async fn update<F>(&self, f: F) -> Exit<A, E>
    where
        F: FnOnce(A) -> A,
    {
        let next = f(self.get()?);
        self.cell.publish(Ok(next.clone())).await;
        Ok(next)
    }
}

/// Feeds a producer's notifications into a cell.
struct Writer<A, E> {
    cell: RefSubject<A, E>,
}

impl<A, E> Sink<A, E> for Writer<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    async fn on_success(&self, value: A) {
        self.cell.set(value).await;
    }

    async fn on_failure(&self, cause: Cause<E>) {
        let _guard = self.cell.inner.updates.lock().await;
        self.cell.publish(Err(cause)).await;
    }
}

impl<A, E> Fx for RefSubject<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = A;
    type Error = E;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<A, E>,
    {
        if self.inner.init.is_some() && !self.inner.deferred.is_set() {
            let _ = self.get().await;
        }
        if let Some(Err(cause)) = self.inner.deferred.current() {
            sink.on_failure(cause).await;
            return;
        }
        self.inner.subject.run(sink).await
    }
}

#[cfg(test)]
mod tests;
