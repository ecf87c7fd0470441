//! Testing utilities for code built on producers.
//!
//! This module provides a recording sink and assertion macros for [`Exit`]
//! values.
//!
//! # Examples
//!
//! ## TestSink
//!
//! ```rust
//! use undertow::prelude::*;
//! use undertow::testing::{Event, TestSink};
//!
//! # tokio_test::block_on(async {
//! let sink = TestSink::new();
//! from_iterable(vec![1, 2]).continue_with(fail("bad")).run(sink.clone()).await;
//!
//! assert_eq!(sink.values(), vec![1, 2]);
//! assert_eq!(
//!     sink.events(),
//!     vec![Event::Value(1), Event::Value(2), Event::Failure(Cause::fail("bad"))]
//! );
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use undertow::{assert_exit_failure, assert_exit_success, Cause, Exit};
//!
//! let success: Exit<i32, String> = Ok(42);
//! assert_exit_success!(success);
//!
//! let failure: Exit<i32, String> = Err(Cause::fail("error".to_string()));
//! assert_exit_failure!(failure);
//! ```

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::cause::{Cause, Exit};
use crate::scope::lock;
use crate::sink::Sink;

/// One notification received by a [`TestSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Event<A, E> {
    /// An `on_success` call.
    Value(A),
    /// An `on_failure` call.
    Failure(Cause<E>),
}

/// A sink recording every notification, in order.
///
/// Clones share the same log, so a clone can be handed to
/// [`Fx::run`](crate::Fx::run) and inspected afterwards.
pub struct TestSink<A, E> {
    events: Arc<Mutex<Vec<Event<A, E>>>>,
}

impl<A, E> TestSink<A, E> {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        TestSink {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of notifications received so far.
    pub fn len(&self) -> usize {
        lock(&self.events).len()
    }

    /// Returns `true` when nothing was received.
    pub fn is_empty(&self) -> bool {
        lock(&self.events).is_empty()
    }
}

impl<A: Clone, E: Clone> TestSink<A, E> {
    /// Every notification, in order.
    pub fn events(&self) -> Vec<Event<A, E>> {
        lock(&self.events).clone()
    }

    /// The values received, in order.
    pub fn values(&self) -> Vec<A> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                Event::Value(value) => Some(value.clone()),
                Event::Failure(_) => None,
            })
            .collect()
    }

    /// The failures received, in order.
    pub fn failures(&self) -> Vec<Cause<E>> {
        lock(&self.events)
            .iter()
            .filter_map(|event| match event {
                Event::Failure(cause) => Some(cause.clone()),
                Event::Value(_) => None,
            })
            .collect()
    }

    /// The outcome as an [`Exit`]: the first failure, else every value.
    pub fn exit(&self) -> Exit<Vec<A>, E> {
        match self.failures().into_iter().next() {
            Some(cause) => Err(cause),
            None => Ok(self.values()),
        }
    }
}

impl<A, E> Default for TestSink<A, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, E> Clone for TestSink<A, E> {
    fn clone(&self) -> Self {
        TestSink {
            events: Arc::clone(&self.events),
        }
    }
}

impl<A, E> fmt::Debug for TestSink<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSink")
            .field("events", &self.len())
            .finish()
    }
}

impl<A, E> Sink<A, E> for TestSink<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    async fn on_success(&self, value: A) {
        lock(&self.events).push(Event::Value(value));
    }

    async fn on_failure(&self, cause: Cause<E>) {
        lock(&self.events).push(Event::Failure(cause));
    }
}

/// Assert that an exit succeeded.
///
/// This macro will panic if the exit is an `Err`.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_exit_success, Exit};
///
/// let exit: Exit<_, String> = Ok(42);
/// assert_exit_success!(exit);
/// ```
#[macro_export]
macro_rules! assert_exit_success {
    ($exit:expr) => {
        match $exit {
            ::std::result::Result::Ok(_) => {}
            ::std::result::Result::Err(cause) => {
                panic!("Expected Ok, got Err: {:?}", cause);
            }
        }
    };
}

/// Assert that an exit failed.
///
/// This macro will panic if the exit is an `Ok`.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_exit_failure, Cause, Exit};
///
/// let exit: Exit<i32, _> = Err(Cause::fail("error"));
/// assert_exit_failure!(exit);
/// ```
#[macro_export]
macro_rules! assert_exit_failure {
    ($exit:expr) => {
        match $exit {
            ::std::result::Result::Err(_) => {}
            ::std::result::Result::Ok(v) => {
                panic!("Expected Err, got Ok: {:?}", v);
            }
        }
    };
}

/// Assert that an exit failed with exactly the typed errors given.
///
/// # Example
///
/// ```rust
/// use undertow::{assert_exit_errors, Cause, Exit};
///
/// let exit: Exit<i32, _> = Err(Cause::fail("a").and(Cause::fail("b")));
/// assert_exit_errors!(exit, vec!["a", "b"]);
/// ```
#[macro_export]
macro_rules! assert_exit_errors {
    ($exit:expr, $expected:expr) => {
        match $exit {
            ::std::result::Result::Err(cause) => {
                assert_eq!(cause.into_failures(), $expected);
            }
            ::std::result::Result::Ok(v) => {
                panic!(
                    "Expected Err with errors {:?}, got Ok: {:?}",
                    $expected, v
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::prelude::*;

    #[tokio::test]
    async fn test_sink_records_in_order() {
        let sink = TestSink::new();
        from_iterable(vec![1, 2])
            .continue_with(fail("bad"))
            .run(sink.clone())
            .await;

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.values(), vec![1, 2]);
        assert_eq!(sink.failures(), vec![Cause::fail("bad")]);
        assert_eq!(sink.exit(), Err(Cause::fail("bad")));
    }

    #[tokio::test]
    async fn test_sink_exit_on_success() {
        let sink = TestSink::<i32, String>::new();
        succeed(1).run(sink.clone()).await;
        assert_eq!(sink.exit(), Ok(vec![1]));
    }

    #[test]
    fn assert_exit_success_macro() {
        let exit: Exit<i32, String> = Ok(1);
        assert_exit_success!(exit);
    }

    #[test]
    fn assert_exit_failure_macro() {
        let exit: Exit<i32, &str> = Err(Cause::fail("error"));
        assert_exit_failure!(exit);
    }

    #[test]
    fn assert_exit_errors_macro() {
        let exit: Exit<i32, &str> = Err(Cause::fail("a").then(Cause::fail("b")));
        assert_exit_errors!(exit, vec!["a", "b"]);
    }

    #[test]
    #[should_panic(expected = "Expected Ok, got Err")]
    fn assert_exit_success_panics_on_failure() {
        let exit: Exit<i32, &str> = Err(Cause::fail("error"));
        assert_exit_success!(exit);
    }

    #[test]
    #[should_panic(expected = "Expected Err, got Ok")]
    fn assert_exit_failure_panics_on_success() {
        let exit: Exit<i32, &str> = Ok(42);
        assert_exit_failure!(exit);
    }

    #[test]
    #[should_panic(expected = "Expected Err with errors")]
    fn assert_exit_errors_panics_on_success() {
        let exit: Exit<i32, &str> = Ok(42);
        assert_exit_errors!(exit, vec!["a"]);
    }
}
