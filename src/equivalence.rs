//! Equivalence relations used for change detection.
//!
//! Every stateful cell in this crate ([`DeferredRef`](crate::DeferredRef),
//! [`RefSubject`](crate::RefSubject)) and the [`skip_repeats_with`]
//! combinator decide "did the value change?" through an [`Equivalence`].
//! Supplying an equivalence appropriate to the value kind is all it takes to
//! get "only notify on change" semantics for that kind.
//!
//! [`skip_repeats_with`]: crate::FxExt::skip_repeats_with
//!
//! # Example
//!
//! ```rust
//! use undertow::Equivalence;
//!
//! let case_insensitive = Equivalence::by_key(|s: &String| s.to_lowercase());
//! assert!(case_insensitive.equals(&"Hello".to_string(), &"hello".to_string()));
//!
//! let pairs = Equivalence::tuple2(Equivalence::strict(), case_insensitive);
//! assert!(pairs.equals(&(1, "A".to_string()), &(1, "a".to_string())));
//! assert!(!pairs.equals(&(1, "A".to_string()), &(2, "a".to_string())));
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::cause::{Cause, Exit};

/// A shared, thread-safe equivalence relation over `T`.
///
/// Implementations are expected to be reflexive, symmetric and transitive;
/// the cells built on top of them rely on it to guarantee that equal writes
/// never notify.
pub struct Equivalence<T: ?Sized> {
    eq: Arc<dyn Fn(&T, &T) -> bool + Send + Sync>,
}

impl<T: ?Sized> Clone for Equivalence<T> {
    fn clone(&self) -> Self {
        Equivalence {
            eq: Arc::clone(&self.eq),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Equivalence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Equivalence")
            .field("eq", &"<function>")
            .finish()
    }
}

impl<T: ?Sized + 'static> Equivalence<T> {
    /// Build an equivalence from a predicate.
    pub fn make<F>(f: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Equivalence { eq: Arc::new(f) }
    }

    /// Are `a` and `b` equivalent?
    pub fn equals(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }

    /// Every pair of values is equivalent.
    pub fn always() -> Self {
        Self::make(|_, _| true)
    }

    /// No pair of values is equivalent, so every write is a change.
    pub fn never() -> Self {
        Self::make(|_, _| false)
    }

    /// Compare values by a derived key.
    pub fn by_key<K, F>(key: F) -> Self
    where
        K: PartialEq,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::make(move |a, b| key(a) == key(b))
    }

    /// Both this and `other` must judge the values equivalent.
    pub fn and(self, other: Equivalence<T>) -> Self {
        Self::make(move |a, b| self.equals(a, b) && other.equals(a, b))
    }

    /// Compare `U` values by projecting them onto `T`.
    pub fn map_input<U, F>(self, f: F) -> Equivalence<U>
    where
        U: 'static,
        F: Fn(&U) -> &T + Send + Sync + 'static,
    {
        Equivalence::make(move |a: &U, b: &U| self.equals(f(a), f(b)))
    }
}

impl<T: PartialEq + ?Sized + 'static> Equivalence<T> {
    /// Structural equality through `PartialEq`.
    pub fn strict() -> Self {
        Self::make(|a, b| a == b)
    }
}

impl<T: PartialEq + ?Sized + 'static> Default for Equivalence<T> {
    fn default() -> Self {
        Self::strict()
    }
}

impl<T: 'static> Equivalence<Option<T>> {
    /// `None ~ None`, `Some(a) ~ Some(b)` when `a ~ b`.
    pub fn option(inner: Equivalence<T>) -> Self {
        Self::make(move |a, b| match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => inner.equals(a, b),
            _ => false,
        })
    }
}

impl<T: 'static, E: 'static> Equivalence<Result<T, E>> {
    /// Compare results variant by variant.
    pub fn result(ok: Equivalence<T>, err: Equivalence<E>) -> Self {
        Self::make(move |a, b| match (a, b) {
            (Ok(a), Ok(b)) => ok.equals(a, b),
            (Err(a), Err(b)) => err.equals(a, b),
            _ => false,
        })
    }
}

impl<T: 'static> Equivalence<Vec<T>> {
    /// Element-wise comparison of equally long vectors.
    pub fn vec(inner: Equivalence<T>) -> Self {
        Self::make(move |a: &Vec<T>, b: &Vec<T>| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| inner.equals(x, y))
        })
    }
}

impl<A: 'static, B: 'static> Equivalence<(A, B)> {
    /// Component-wise comparison of pairs.
    pub fn tuple2(a: Equivalence<A>, b: Equivalence<B>) -> Self {
        Self::make(move |x, y| a.equals(&x.0, &y.0) && b.equals(&x.1, &y.1))
    }
}

impl<A: 'static, B: 'static, C: 'static> Equivalence<(A, B, C)> {
    /// Component-wise comparison of triples.
    pub fn tuple3(a: Equivalence<A>, b: Equivalence<B>, c: Equivalence<C>) -> Self {
        Self::make(move |x, y| {
            a.equals(&x.0, &y.0) && b.equals(&x.1, &y.1) && c.equals(&x.2, &y.2)
        })
    }
}

impl<K, V> Equivalence<HashMap<K, V>>
where
    K: Eq + Hash + 'static,
    V: 'static,
{
    /// Same key set, equivalent values for every key.
    pub fn hash_map(values: Equivalence<V>) -> Self {
        Self::make(move |a: &HashMap<K, V>, b: &HashMap<K, V>| {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| values.equals(v, w)))
        })
    }
}

impl<K> Equivalence<HashSet<K>>
where
    K: Eq + Hash + 'static,
{
    /// Same members, regardless of iteration order.
    pub fn hash_set() -> Self {
        Self::make(|a: &HashSet<K>, b: &HashSet<K>| a == b)
    }
}

impl<K, V> Equivalence<BTreeMap<K, V>>
where
    K: Ord + 'static,
    V: 'static,
{
    /// Same key set, equivalent values for every key.
    pub fn btree_map(values: Equivalence<V>) -> Self {
        Self::make(move |a: &BTreeMap<K, V>, b: &BTreeMap<K, V>| {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|((ka, va), (kb, vb))| ka == kb && values.equals(va, vb))
        })
    }
}

impl Equivalence<f64> {
    /// Floats within `epsilon` of each other are equivalent; `NaN ~ NaN`.
    pub fn f64_approx(epsilon: f64) -> Self {
        Self::make(move |a: &f64, b: &f64| {
            (a.is_nan() && b.is_nan()) || (a - b).abs() <= epsilon
        })
    }
}

impl Equivalence<Duration> {
    /// Durations of the same length.
    pub fn duration() -> Self {
        Self::make(|a: &Duration, b: &Duration| a == b)
    }
}

impl<A: 'static, E: 'static> Equivalence<Exit<A, E>> {
    /// Compare successes with `value`. Two failures are never equivalent, so
    /// every published failure is observed.
    pub fn exit(value: Equivalence<A>) -> Self {
        Self::make(move |a: &Exit<A, E>, b: &Exit<A, E>| match (a, b) {
            (Ok(a), Ok(b)) => value.equals(a, b),
            _ => false,
        })
    }

    /// Compare successes with `value` and failures with `cause`.
    pub fn exit_with(value: Equivalence<A>, cause: Equivalence<Cause<E>>) -> Self {
        Self::make(move |a: &Exit<A, E>, b: &Exit<A, E>| match (a, b) {
            (Ok(a), Ok(b)) => value.equals(a, b),
            (Err(a), Err(b)) => cause.equals(a, b),
            _ => false,
        })
    }
}
