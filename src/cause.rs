//! The failure channel of a stream.
//!
//! A stream never fails with a bare `E`. Every failure is a [`Cause`], a sum of
//! three kinds of termination that must never be confused with each other:
//!
//! - **typed failure** ([`Cause::Fail`]) - an expected, domain-modeled error
//! - **defect** ([`Cause::Die`]) - an unexpected failure, usually a bug or a panic
//! - **interruption** ([`Cause::Interrupt`]) - cooperative cancellation, carrying
//!   the identity of the interrupting fiber
//!
//! Causes combine: concurrent failures accumulate with [`Cause::and`], failures
//! observed one after another (a failing finalizer after a failing body) chain
//! with [`Cause::then`].
//!
//! Combinators that "catch errors" only ever look at the typed failures of a
//! cause. Combinators that "catch causes" see all three kinds.
//!
//! # Example
//!
//! ```rust
//! use undertow::{Cause, FiberId};
//!
//! let cause = Cause::fail("not found").and(Cause::interrupt(FiberId::none()));
//!
//! assert!(cause.is_failure());
//! assert!(cause.is_interrupted());
//! assert!(!cause.is_interrupted_only());
//! assert_eq!(cause.failures(), vec![&"not found"]);
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// The terminal outcome of a computation: a success value or a [`Cause`].
pub type Exit<A, E> = Result<A, Cause<E>>;

static NEXT_FIBER_ID: AtomicU64 = AtomicU64::new(1);

tokio::task_local! {
    static CURRENT_FIBER: FiberId;
}

/// Identity of a fiber (a task forked through a [`Scope`](crate::Scope)).
///
/// Fiber ids are process-unique and never reused. [`FiberId::none()`] stands
/// for "no particular fiber", e.g. an interruption requested from outside any
/// forked task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FiberId(u64);

impl FiberId {
    /// The id used when no fiber is responsible.
    pub const fn none() -> Self {
        FiberId(0)
    }

    /// Allocate a new, never used id.
    pub fn fresh() -> Self {
        FiberId(NEXT_FIBER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The id of the fiber currently executing, or [`FiberId::none()`] when
    /// called outside of a forked fiber.
    pub fn current() -> Self {
        CURRENT_FIBER.try_with(|id| *id).unwrap_or(FiberId::none())
    }

    /// Numeric value of this id.
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns `true` for [`FiberId::none()`].
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    pub(crate) fn run_as<F: Future>(self, fut: F) -> impl Future<Output = F::Output> {
        CURRENT_FIBER.scope(self, fut)
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            write!(f, "#none")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// An unexpected failure.
///
/// Defects are not meant to be pattern-matched on; they carry a message for
/// logging and escalation. Panics caught while running a stream become
/// defects through [`Defect::from_panic`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Defect {
    message: Arc<str>,
}

impl Defect {
    /// Create a defect with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Defect {
            message: Arc::from(message.into()),
        }
    }

    /// Convert a panic payload (as returned by `catch_unwind` or a panicked
    /// `JoinError`) into a defect.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with a non-string payload".to_string()
        };
        Defect::new(message)
    }

    /// The defect message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Defect").field(&&*self.message).finish()
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Defect {}

/// Why a stream terminated unsuccessfully.
///
/// See the [module documentation](self) for the meaning of each variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause<E> {
    /// No failure at all. Identity of [`Cause::then`] and [`Cause::and`].
    Empty,
    /// An expected, typed failure.
    Fail(E),
    /// An unexpected failure.
    Die(Defect),
    /// Cooperative cancellation requested by the given fiber.
    Interrupt(FiberId),
    /// Two causes that happened one after the other.
    Sequential(Box<Cause<E>>, Box<Cause<E>>),
    /// Two causes that happened concurrently.
    Parallel(Box<Cause<E>>, Box<Cause<E>>),
}

impl<E> Cause<E> {
    /// A typed failure.
    pub fn fail(error: E) -> Self {
        Cause::Fail(error)
    }

    /// A defect.
    pub fn die(defect: impl Into<Defect>) -> Self {
        Cause::Die(defect.into())
    }

    /// A defect carrying only a message.
    pub fn die_message(message: impl Into<String>) -> Self {
        Cause::Die(Defect::new(message))
    }

    /// An interruption by the given fiber.
    pub fn interrupt(fiber: FiberId) -> Self {
        Cause::Interrupt(fiber)
    }

    /// The empty cause.
    pub fn empty() -> Self {
        Cause::Empty
    }

    /// Chain `next` after this cause.
    pub fn then(self, next: Cause<E>) -> Self {
        match (self.is_empty(), next.is_empty()) {
            (true, _) => next,
            (_, true) => self,
            _ => Cause::Sequential(Box::new(self), Box::new(next)),
        }
    }

    /// Combine this cause with one that happened concurrently.
    pub fn and(self, other: Cause<E>) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => other,
            (_, true) => self,
            _ => Cause::Parallel(Box::new(self), Box::new(other)),
        }
    }

    /// Returns `true` when the cause contains no failure of any kind.
    pub fn is_empty(&self) -> bool {
        match self {
            Cause::Empty => true,
            Cause::Fail(_) | Cause::Die(_) | Cause::Interrupt(_) => false,
            Cause::Sequential(l, r) | Cause::Parallel(l, r) => l.is_empty() && r.is_empty(),
        }
    }

    /// Returns `true` when the cause contains at least one typed failure.
    pub fn is_failure(&self) -> bool {
        self.find(&mut |c| matches!(c, Cause::Fail(_)))
    }

    /// Returns `true` when the cause contains at least one defect.
    pub fn is_die(&self) -> bool {
        self.find(&mut |c| matches!(c, Cause::Die(_)))
    }

    /// Returns `true` when the cause contains at least one interruption.
    pub fn is_interrupted(&self) -> bool {
        self.find(&mut |c| matches!(c, Cause::Interrupt(_)))
    }

    /// Returns `true` when the cause is made only of interruptions.
    pub fn is_interrupted_only(&self) -> bool {
        self.is_interrupted() && !self.is_failure() && !self.is_die()
    }

    /// All typed failures, in depth-first order.
    pub fn failures(&self) -> Vec<&E> {
        let mut out = Vec::new();
        self.walk(&mut |c| {
            if let Cause::Fail(e) = c {
                out.push(e);
            }
        });
        out
    }

    /// All defects, in depth-first order.
    pub fn defects(&self) -> Vec<&Defect> {
        let mut out = Vec::new();
        self.walk(&mut |c| {
            if let Cause::Die(d) = c {
                out.push(d);
            }
        });
        out
    }

    /// The fibers that caused every interruption in this cause.
    pub fn interruptors(&self) -> Vec<FiberId> {
        let mut out = Vec::new();
        self.walk(&mut |c| {
            if let Cause::Interrupt(id) = c {
                if !out.contains(id) {
                    out.push(*id);
                }
            }
        });
        out
    }

    /// Consume the cause and return its typed failures.
    pub fn into_failures(self) -> Vec<E> {
        let mut out = Vec::new();
        self.into_walk(&mut |e| out.push(e));
        out
    }

    /// The first typed failure if there is one, otherwise the cause itself.
    ///
    /// This is how "catch the error" combinators decide whether to recover.
    pub fn failure_or_cause(self) -> Result<E, Cause<E>> {
        if !self.is_failure() {
            return Err(self);
        }
        match self.into_failures().into_iter().next() {
            Some(e) => Ok(e),
            None => Err(Cause::Empty),
        }
    }

    /// Transform the typed failures, leaving defects and interruptions untouched.
    pub fn map<E2, F>(self, mut f: F) -> Cause<E2>
    where
        F: FnMut(E) -> E2,
    {
        self.flat_map(&mut |e| Cause::Fail(f(e)))
    }

    /// Replace every typed failure by a whole cause.
    pub fn flat_map<E2, F>(self, f: &mut F) -> Cause<E2>
    where
        F: FnMut(E) -> Cause<E2>,
    {
        match self {
            Cause::Empty => Cause::Empty,
            Cause::Fail(e) => f(e),
            Cause::Die(d) => Cause::Die(d),
            Cause::Interrupt(id) => Cause::Interrupt(id),
            Cause::Sequential(l, r) => l.flat_map(f).then(r.flat_map(f)),
            Cause::Parallel(l, r) => l.flat_map(f).and(r.flat_map(f)),
        }
    }

    /// Drop typed failures, keeping defects and interruptions.
    ///
    /// The result can be re-typed with any error type, which is how a stream
    /// whose failures were materialized still forwards defects.
    pub fn strip_failures<E2>(self) -> Cause<E2> {
        self.flat_map(&mut |_| Cause::Empty)
    }

    /// Render the most significant part of the cause: the first typed
    /// failure, else the first defect, else the interruption.
    pub fn squash(&self) -> String
    where
        E: fmt::Display,
    {
        if let Some(e) = self.failures().first() {
            return e.to_string();
        }
        if let Some(d) = self.defects().first() {
            return d.to_string();
        }
        match self.interruptors().first() {
            Some(id) => format!("interrupted by fiber {}", id),
            None => "empty cause".to_string(),
        }
    }

    fn find(&self, pred: &mut impl FnMut(&Cause<E>) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Cause::Sequential(l, r) | Cause::Parallel(l, r) => l.find(pred) || r.find(pred),
            _ => false,
        }
    }

    fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Cause<E>)) {
        match self {
            Cause::Sequential(l, r) | Cause::Parallel(l, r) => {
                l.walk(visit);
                r.walk(visit);
            }
            leaf => visit(leaf),
        }
    }

    fn into_walk(self, visit: &mut impl FnMut(E)) {
        match self {
            Cause::Fail(e) => visit(e),
            Cause::Sequential(l, r) | Cause::Parallel(l, r) => {
                l.into_walk(visit);
                r.into_walk(visit);
            }
            _ => {}
        }
    }
}

impl<E> From<Defect> for Cause<E> {
    fn from(defect: Defect) -> Self {
        Cause::Die(defect)
    }
}

impl<E: fmt::Display> fmt::Display for Cause<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::Empty => write!(f, "Empty"),
            Cause::Fail(e) => write!(f, "Fail({})", e),
            Cause::Die(d) => write!(f, "Die({})", d),
            Cause::Interrupt(id) => write!(f, "Interrupt({})", id),
            Cause::Sequential(l, r) => write!(f, "({} ; {})", l, r),
            Cause::Parallel(l, r) => write!(f, "({} | {})", l, r),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Cause<E> {}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl<E> Arbitrary for Cause<E>
where
    E: Arbitrary + Clone + 'static,
{
    type Parameters = E::Parameters;
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(args: Self::Parameters) -> Self::Strategy {
        let leaf = prop_oneof![
            any_with::<E>(args).prop_map(Cause::Fail),
            "[a-z ]{1,16}".prop_map(|m: String| Cause::die_message(m)),
            (1u64..64).prop_map(|n| Cause::Interrupt(FiberId(n))),
        ];
        leaf.prop_recursive(3, 16, 2, |inner| {
            prop_oneof![
                (inner.clone(), inner.clone()).prop_map(|(l, r)| Cause::Sequential(
                    Box::new(l),
                    Box::new(r)
                )),
                (inner.clone(), inner).prop_map(|(l, r)| Cause::Parallel(
                    Box::new(l),
                    Box::new(r)
                )),
            ]
        })
        .boxed()
    }
}
