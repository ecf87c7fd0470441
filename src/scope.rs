//! Scoped fibers.
//!
//! A [`Scope`] owns a set of forked tasks ("fibers"), an ordered list of
//! finalizers and any child scopes created through [`Scope::extend`].
//! Closing a scope deterministically interrupts every fiber it owns, waits for
//! all of them to terminate, closes its children and then runs its finalizers
//! in reverse registration order. Nothing forked into a scope outlives it.
//!
//! Every concurrency combinator opens one scope per subscription, forks its
//! inner work into it, and closes it before the subscription completes.
//!
//! ```rust
//! use undertow::Scope;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let scope = Scope::new();
//! let finalized = Arc::new(AtomicBool::new(false));
//!
//! let flag = finalized.clone();
//! scope.add_finalizer(move || flag.store(true, Ordering::SeqCst));
//!
//! let fiber = scope.fork(std::future::pending::<()>());
//! scope.close().await;
//!
//! assert!(fiber.is_done());
//! assert!(finalized.load(Ordering::SeqCst));
//! # });
//! ```

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::FutureExt;
use tokio::sync::Notify;
use tokio::task::AbortHandle;

use crate::cause::{Cause, Defect, Exit, FiberId};

type Finalizer = Box<dyn FnOnce() + Send>;

/// Lock a std mutex, recovering the data if a panicking thread poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Owner of a set of fibers and finalizers.
///
/// Dropping a scope that was not closed aborts its fibers and runs its
/// finalizers synchronously, without waiting for the fibers to stop. Prefer
/// [`Scope::close`] whenever an `.await` is possible.
pub struct Scope {
    handle: ScopeHandle,
}

/// A cloneable reference to a [`Scope`], able to fork into it.
///
/// Holding a handle does not keep the scope open: closing or dropping the
/// owning [`Scope`] interrupts everything forked through any of its handles.
#[derive(Clone)]
pub struct ScopeHandle {
    shared: Arc<ScopeShared>,
}

struct ScopeShared {
    state: Mutex<ScopeState>,
    idle: Notify,
}

#[derive(Default)]
struct ScopeState {
    closed: bool,
    fibers: HashMap<FiberId, Option<AbortHandle>>,
    finalizers: Vec<Finalizer>,
    children: Vec<Weak<ScopeShared>>,
}

impl Scope {
    /// Open a new, empty scope.
    pub fn new() -> Self {
        Scope {
            handle: ScopeHandle {
                shared: Arc::new(ScopeShared {
                    state: Mutex::new(ScopeState::default()),
                    idle: Notify::new(),
                }),
            },
        }
    }

    /// A cloneable handle to this scope.
    pub fn handle(&self) -> ScopeHandle {
        self.handle.clone()
    }

    /// Fork a future into this scope. See [`ScopeHandle::fork`].
    pub fn fork<F>(&self, fut: F) -> Fiber
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.fork(fut)
    }

    /// Register a finalizer. See [`ScopeHandle::add_finalizer`].
    pub fn add_finalizer<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.handle.add_finalizer(f)
    }

    /// Open a child scope that is closed together with this one.
    pub fn extend(&self) -> Scope {
        self.handle.extend()
    }

    /// Wait until no fiber forked into this scope is still running.
    pub async fn await_idle(&self) {
        self.handle.await_idle().await
    }

    /// Returns `true` once the scope has been closed.
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    /// Number of fibers currently running in this scope.
    pub fn live_fibers(&self) -> usize {
        self.handle.live_fibers()
    }

    /// Close the scope: interrupt and await every fiber, close child scopes,
    /// then run finalizers in reverse order. Idempotent.
    pub async fn close(&self) {
        self.handle.shared.close().await
    }
}

impl AsRef<ScopeHandle> for Scope {
    fn as_ref(&self) -> &ScopeHandle {
        &self.handle
    }
}

impl AsRef<ScopeHandle> for ScopeHandle {
    fn as_ref(&self) -> &ScopeHandle {
        self
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.handle.shared.close_now();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("closed", &self.is_closed())
            .field("live_fibers", &self.live_fibers())
            .finish()
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeHandle")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl ScopeHandle {
    /// Fork `fut` onto the runtime as a fiber owned by this scope.
    ///
    /// A panic inside the fiber is caught and recorded as a
    /// [`Cause::Die`] in its exit. Forking into a closed scope spawns nothing
    /// and returns a fiber that is already interrupted.
    pub fn fork<F>(&self, fut: F) -> Fiber
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let id = FiberId::fresh();
        let status = Arc::new(FiberStatus::default());

        {
            let mut state = lock(&self.shared.state);
            if state.closed {
                drop(state);
                tracing::trace!(fiber = %id, "fork refused: scope closed");
                status.complete(Err(Cause::interrupt(FiberId::current())));
                return Fiber {
                    id,
                    abort: None,
                    status,
                };
            }
            state.fibers.insert(id, None);
        }

        let guard = FiberGuard {
            id,
            scope: Arc::downgrade(&self.shared),
            status: Arc::clone(&status),
            outcome: None,
        };

        let task = tokio::spawn(id.run_as(async move {
            let mut guard = guard;
            let outcome = AssertUnwindSafe(fut).catch_unwind().await;
            guard.outcome = Some(match outcome {
                Ok(()) => Ok(()),
                Err(payload) => {
                    let defect = Defect::from_panic(payload);
                    tracing::warn!(fiber = %guard.id, defect = %defect, "fiber panicked");
                    Err(Cause::die(defect))
                }
            });
        }));
        let abort = task.abort_handle();
        tracing::trace!(fiber = %id, "forked");

        let abort_now = {
            let mut state = lock(&self.shared.state);
            match state.fibers.get_mut(&id) {
                Some(slot) => {
                    *slot = Some(abort.clone());
                    state.closed
                }
                None => false,
            }
        };
        if abort_now {
            abort.abort();
        }

        Fiber {
            id,
            abort: Some(abort),
            status,
        }
    }

    /// Register a finalizer run when the scope closes. On an already closed
    /// scope the finalizer runs immediately.
    pub fn add_finalizer<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = lock(&self.shared.state);
        if state.closed {
            drop(state);
            run_finalizer(Box::new(f));
        } else {
            state.finalizers.push(Box::new(f));
        }
    }

    /// Open a child scope that is closed together with this one.
    pub fn extend(&self) -> Scope {
        let child = Scope::new();
        let mut state = lock(&self.shared.state);
        if state.closed {
            drop(state);
            child.handle.shared.close_now();
        } else {
            state.children.retain(|c| c.strong_count() > 0);
            state.children.push(Arc::downgrade(&child.handle.shared));
        }
        child
    }

    /// Wait until no fiber forked into this scope is still running.
    pub async fn await_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if lock(&self.shared.state).fibers.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Returns `true` once the scope has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.shared.state).closed
    }

    /// Number of fibers currently running in this scope.
    pub fn live_fibers(&self) -> usize {
        lock(&self.shared.state).fibers.len()
    }
}

impl ScopeShared {
    fn begin_close(&self) -> Option<(Vec<AbortHandle>, Vec<Finalizer>, Vec<Arc<ScopeShared>>)> {
        let mut state = lock(&self.state);
        if state.closed {
            return None;
        }
        state.closed = true;
        let aborts = state.fibers.values().flatten().cloned().collect();
        let finalizers = std::mem::take(&mut state.finalizers);
        let children = state
            .children
            .drain(..)
            .filter_map(|child| child.upgrade())
            .collect();
        Some((aborts, finalizers, children))
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let Some((aborts, finalizers, children)) = self.begin_close() else {
                self.await_idle().await;
                return;
            };
            tracing::debug!(fibers = aborts.len(), children = children.len(), "closing scope");

            for abort in &aborts {
                abort.abort();
            }
            for child in children {
                child.close().await;
            }
            self.await_idle().await;

            for finalizer in finalizers.into_iter().rev() {
                run_finalizer(finalizer);
            }
        })
    }

    fn close_now(&self) {
        let Some((aborts, finalizers, children)) = self.begin_close() else {
            return;
        };
        for abort in &aborts {
            abort.abort();
        }
        for child in children {
            child.close_now();
        }
        for finalizer in finalizers.into_iter().rev() {
            run_finalizer(finalizer);
        }
    }

    async fn await_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if lock(&self.state).fibers.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn release(&self, id: FiberId) {
        let mut state = lock(&self.state);
        state.fibers.remove(&id);
        if state.fibers.is_empty() {
            drop(state);
            self.idle.notify_waiters();
        }
    }
}

fn run_finalizer(finalizer: Finalizer) {
    if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(finalizer)) {
        tracing::warn!(defect = %Defect::from_panic(payload), "scope finalizer panicked");
    }
}

/// Removes the fiber from its scope and publishes its exit when the task's
/// future completes or is dropped by an abort.
struct FiberGuard {
    id: FiberId,
    scope: Weak<ScopeShared>,
    status: Arc<FiberStatus>,
    outcome: Option<Exit<(), Infallible>>,
}

impl Drop for FiberGuard {
    fn drop(&mut self) {
        let exit = self.outcome.take().unwrap_or_else(|| {
            let by = self.status.interrupted_by();
            tracing::trace!(fiber = %self.id, by = %by, "fiber interrupted");
            Err(Cause::interrupt(by))
        });
        self.status.complete(exit);
        if let Some(scope) = self.scope.upgrade() {
            scope.release(self.id);
        }
    }
}

#[derive(Default)]
struct FiberStatus {
    exit: Mutex<Option<Exit<(), Infallible>>>,
    interruptor: Mutex<Option<FiberId>>,
    done: Notify,
}

impl FiberStatus {
    fn complete(&self, exit: Exit<(), Infallible>) {
        *lock(&self.exit) = Some(exit);
        self.done.notify_waiters();
    }

    fn interrupted_by(&self) -> FiberId {
        lock(&self.interruptor).unwrap_or(FiberId::none())
    }

    fn exit(&self) -> Option<Exit<(), Infallible>> {
        lock(&self.exit).clone()
    }
}

/// Handle to a forked fiber.
pub struct Fiber {
    id: FiberId,
    abort: Option<AbortHandle>,
    status: Arc<FiberStatus>,
}

impl Fiber {
    /// The fiber's id.
    pub fn id(&self) -> FiberId {
        self.id
    }

    /// Returns `true` once the fiber has terminated for any reason.
    pub fn is_done(&self) -> bool {
        self.status.exit().is_some()
    }

    /// Wait for the fiber to terminate.
    ///
    /// A fiber that ran to completion exits with `Ok(())`; one that was
    /// aborted exits with [`Cause::Interrupt`]; one that panicked exits with
    /// [`Cause::Die`].
    pub async fn join(&self) -> Exit<(), Infallible> {
        loop {
            let notified = self.status.done.notified();
            if let Some(exit) = self.status.exit() {
                return exit;
            }
            notified.await;
        }
    }

    /// Interrupt the fiber and wait for it to terminate.
    pub async fn interrupt(&self) -> Exit<(), Infallible> {
        self.interrupt_now();
        self.join().await
    }

    /// Request interruption without waiting.
    pub fn interrupt_now(&self) {
        if let Some(abort) = &self.abort {
            lock(&self.status.interruptor).get_or_insert_with(FiberId::current);
            abort.abort();
        }
    }
}

impl fmt::Debug for Fiber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fiber")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

/// A one-shot "stop now" signal.
///
/// The first terminal event of a subscription (a failure, or a voluntary stop
/// such as `take` reaching its count) fires the signal; the subscription's
/// driver races the upstream against it and drops the upstream once fired.
#[derive(Clone, Default)]
pub(crate) struct ExitSignal {
    inner: Arc<ExitSignalInner>,
}

#[derive(Default)]
struct ExitSignalInner {
    fired: AtomicBool,
    notify: Notify,
}

impl ExitSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` only for the first caller.
    pub(crate) fn fire(&self) -> bool {
        let first = !self.inner.fired.swap(true, Ordering::SeqCst);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub(crate) fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::SeqCst)
    }

    pub(crate) async fn fired(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_fired() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `fut` until it completes or the signal fires.
    pub(crate) async fn race<F>(&self, fut: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = self.fired() => {}
            _ = fut => {}
        }
    }
}
