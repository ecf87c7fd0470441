//! DeferredRef - a single-slot, versioned, deduplicating state cell.
//!
//! A [`DeferredRef`] starts out empty. Readers calling [`DeferredRef::get`]
//! suspend until an [`Exit`] is published with [`DeferredRef::done`]. After
//! that, reads return at once. Each publish is compared with the stored exit
//! under the cell's [`Equivalence`]. An equivalent exit is ignored: nothing
//! changes and nobody is woken. A different exit replaces the stored one and
//! bumps the version.
//!
//! [`DeferredRef::reset`] empties the cell again and interrupts every reader
//! still waiting.
//!
//! # Example
//!
//! ```rust
//! use undertow::{DeferredRef, Equivalence};
//!
//! # tokio_test::block_on(async {
//! let cell = DeferredRef::<i32, String>::new(Equivalence::exit(Equivalence::strict()));
//!
//! let reader = {
//!     let cell = cell.clone();
//!     tokio::spawn(async move { cell.get().await })
//! };
//! tokio::task::yield_now().await;
//!
//! assert!(cell.done(Ok(1)));
//! assert!(!cell.done(Ok(1)));
//! assert_eq!(cell.version(), 1);
//! assert_eq!(reader.await.unwrap(), Ok(1));
//! # });
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::cause::{Cause, Exit, FiberId};
use crate::equivalence::Equivalence;
use crate::scope::lock;

/// A versioned cell holding at most one [`Exit`], with suspending reads.
///
/// Cloning is cheap and every clone shares the same slot.
pub struct DeferredRef<A, E> {
    inner: Arc<Inner<A, E>>,
}

struct Inner<A, E> {
    state: Mutex<State<A, E>>,
    notify: Notify,
    eq: Equivalence<Exit<A, E>>,
}

struct State<A, E> {
    current: Option<Exit<A, E>>,
    version: u64,
    /// Bumped whenever pending readers must give up.
    epoch: u64,
}

impl<A, E> Clone for DeferredRef<A, E> {
    fn clone(&self) -> Self {
        DeferredRef {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, E> fmt::Debug for DeferredRef<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("DeferredRef")
            .field("has_value", &state.current.is_some())
            .field("version", &state.version)
            .finish()
    }
}

impl<A, E> DeferredRef<A, E>
where
    A: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// An empty cell deduplicating publishes with `eq`.
    pub fn new(eq: Equivalence<Exit<A, E>>) -> Self {
        DeferredRef {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    current: None,
                    version: 0,
                    epoch: 0,
                }),
                notify: Notify::new(),
                eq,
            }),
        }
    }

    /// A cell already holding `initial`, at version 1.
    pub fn make(initial: A, eq: Equivalence<Exit<A, E>>) -> Self {
        let cell = Self::new(eq);
        cell.done(Ok(initial));
        cell
    }

    /// Wait for an exit and return a copy of it.
    ///
    /// Resolves to [`Cause::Interrupt`] if the cell is reset or interrupted
    /// while this read is waiting.
    pub async fn get(&self) -> Exit<A, E> {
        let epoch = lock(&self.inner.state).epoch;
        loop {
            let notified = self.inner.notify.notified();
            {
                let state = lock(&self.inner.state);
                if let Some(exit) = &state.current {
                    return exit.clone();
                }
                if state.epoch != epoch {
                    return Err(Cause::interrupt(FiberId::current()));
                }
            }
            notified.await;
        }
    }

    /// The stored exit, without waiting.
    pub fn current(&self) -> Option<Exit<A, E>> {
        lock(&self.inner.state).current.clone()
    }

    /// Publish `exit` unless it is equivalent to the stored one.
    ///
    /// Returns `true` when the exit was stored and readers were woken.
    pub fn done(&self, exit: Exit<A, E>) -> bool {
        let version = {
            let mut state = lock(&self.inner.state);
            if let Some(current) = &state.current {
                if self.inner.eq.equals(current, &exit) {
                    return false;
                }
            }
            state.current = Some(exit);
            state.version += 1;
            state.version
        };
        self.inner.notify.notify_waiters();
        tracing::trace!(version, "deferred ref published");
        true
    }

    /// Empty the cell, interrupting pending readers, and return what it held.
    ///
    /// The version is left unchanged.
    pub fn reset(&self) -> Option<Exit<A, E>> {
        let previous = {
            let mut state = lock(&self.inner.state);
            state.epoch += 1;
            state.current.take()
        };
        self.inner.notify.notify_waiters();
        tracing::trace!(had_value = previous.is_some(), "deferred ref reset");
        previous
    }

    /// Interrupt pending readers without touching the stored exit.
    pub fn interrupt(&self) {
        lock(&self.inner.state).epoch += 1;
        self.inner.notify.notify_waiters();
    }

    /// Number of effective publishes so far.
    pub fn version(&self) -> u64 {
        lock(&self.inner.state).version
    }

    /// Returns `true` when an exit is stored.
    pub fn is_set(&self) -> bool {
        lock(&self.inner.state).current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn cell() -> DeferredRef<i32, String> {
        DeferredRef::new(Equivalence::exit(Equivalence::strict()))
    }

    #[tokio::test]
    async fn read_after_publish_is_immediate() {
        let cell = DeferredRef::<i32, String>::make(7, Equivalence::exit(Equivalence::strict()));
        assert_eq!(cell.version(), 1);
        assert_eq!(cell.get().await, Ok(7));
        assert_eq!(cell.current(), Some(Ok(7)));
    }

    #[tokio::test]
    async fn equivalent_publish_is_ignored() {
        let cell = cell();
        assert!(cell.done(Ok(1)));
        assert!(!cell.done(Ok(1)));
        assert!(cell.done(Ok(2)));
        assert_eq!(cell.version(), 2);
    }

    #[tokio::test]
    async fn failures_are_always_published() {
        let cell = cell();
        assert!(cell.done(Err(Cause::fail("x".to_string()))));
        assert!(cell.done(Err(Cause::fail("x".to_string()))));
        assert_eq!(cell.version(), 2);
    }

    #[tokio::test]
    async fn waiters_are_woken_by_publish() {
        let cell = cell();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let cell = cell.clone();
                tokio::spawn(async move { cell.get().await })
            })
            .collect();
        tokio::task::yield_now().await;

        cell.done(Ok(5));
        for waiter in waiters {
            assert_eq!(waiter.await.unwrap(), Ok(5));
        }
    }

    #[tokio::test]
    async fn reset_interrupts_pending_readers() {
        let cell = cell();
        let reader = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.get().await })
        };
        tokio::task::yield_now().await;

        assert_eq!(cell.reset(), None);
        assert!(reader.await.unwrap().unwrap_err().is_interrupted());
    }

    #[tokio::test]
    async fn reset_empties_but_keeps_version() {
        let cell = cell();
        cell.done(Ok(1));
        assert_eq!(cell.reset(), Some(Ok(1)));
        assert!(!cell.is_set());
        assert_eq!(cell.version(), 1);

        // the next publish is never deduplicated against the cleared value
        assert!(cell.done(Ok(1)));
        assert_eq!(cell.version(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_read_waits() {
        let cell = cell();
        let read = tokio::time::timeout(Duration::from_secs(1), cell.get()).await;
        assert!(read.is_err());
    }

    #[tokio::test]
    async fn interrupt_keeps_the_value() {
        let cell = cell();
        let reader = {
            let cell = cell.clone();
            tokio::spawn(async move { cell.get().await })
        };
        tokio::task::yield_now().await;

        cell.interrupt();
        assert!(reader.await.unwrap().unwrap_err().is_interrupted());

        cell.done(Ok(3));
        cell.interrupt();
        assert_eq!(cell.get().await, Ok(3));
    }
}
