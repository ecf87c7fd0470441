//! Cells with operations tailored to their value type.
//!
//! Every operation here is a plain [`RefSubject::update`] or
//! [`RefSubject::modify`]; change detection still comes from the cell's
//! equivalence.

use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;

use crate::cause::Exit;
use crate::ref_subject::RefSubject;

/// A boolean cell.
pub type RefBool<E = Infallible> = RefSubject<bool, E>;

/// A numeric cell.
pub type RefNumber<N, E = Infallible> = RefSubject<N, E>;

/// A cell holding a vector.
pub type RefVec<T, E = Infallible> = RefSubject<Vec<T>, E>;

/// A cell holding an optional value.
pub type RefOption<T, E = Infallible> = RefSubject<Option<T>, E>;

/// A cell holding a hash map.
pub type RefHashMap<K, V, E = Infallible> = RefSubject<HashMap<K, V>, E>;

impl<E> RefSubject<bool, E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Flip the value and return the new one.
    pub async fn toggle(&self) -> Exit<bool, E> {
        self.update(|b| !b).await
    }
}

macro_rules! ref_integer {
    ($($n:ty),* $(,)?) => {$(
        impl<E> RefSubject<$n, E>
        where
            E: Clone + Send + Sync + 'static,
        {
            /// Add one, saturating at the maximum.
            pub async fn increment(&self) -> Exit<$n, E> {
                self.update(|n| n.saturating_add(1)).await
            }

            /// Subtract one, saturating at the minimum.
            pub async fn decrement(&self) -> Exit<$n, E> {
                self.update(|n| n.saturating_sub(1)).await
            }

            /// Add `delta`, saturating at the bounds.
            pub async fn add(&self, delta: $n) -> Exit<$n, E> {
                self.update(|n| n.saturating_add(delta)).await
            }
        }
    )*};
}

macro_rules! ref_float {
    ($($n:ty),* $(,)?) => {$(
        impl<E> RefSubject<$n, E>
        where
            E: Clone + Send + Sync + 'static,
        {
            /// Add one.
            pub async fn increment(&self) -> Exit<$n, E> {
                self.update(|n| n + 1.0).await
            }

            /// Subtract one.
            pub async fn decrement(&self) -> Exit<$n, E> {
                self.update(|n| n - 1.0).await
            }

            /// Add `delta`.
            pub async fn add(&self, delta: $n) -> Exit<$n, E> {
                self.update(|n| n + delta).await
            }
        }
    )*};
}

ref_integer!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
ref_float!(f32, f64);

impl<T, E> RefSubject<Vec<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Append one element.
    pub async fn push(&self, value: T) -> Exit<Vec<T>, E> {
        self.update(|mut items| {
            items.push(value);
            items
        })
        .await
    }

    /// Remove and return the last element.
    pub async fn pop(&self) -> Exit<Option<T>, E> {
        self.modify(|mut items| (items.pop(), items)).await
    }

    /// Append every element of `values`.
    pub async fn append<I>(&self, values: I) -> Exit<Vec<T>, E>
    where
        I: IntoIterator<Item = T>,
    {
        self.update(|mut items| {
            items.extend(values);
            items
        })
        .await
    }

    /// Remove every element.
    pub async fn clear_all(&self) -> Exit<Vec<T>, E> {
        self.update(|_| Vec::new()).await
    }

    /// Number of elements.
    pub async fn len(&self) -> Exit<usize, E> {
        self.get().await.map(|items| items.len())
    }

    /// Returns `true` when there are no elements.
    pub async fn is_empty(&self) -> Exit<bool, E> {
        self.get().await.map(|items| items.is_empty())
    }
}

impl<T, E> RefSubject<Option<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// The contained value, or `default` when there is none.
    pub async fn get_or(&self, default: T) -> Exit<T, E> {
        self.get().await.map(|value| value.unwrap_or(default))
    }

    /// Store `Some(value)`.
    pub async fn set_some(&self, value: T) -> Option<T> {
        self.set(Some(value)).await
    }

    /// Store `None` and return the previous value.
    pub async fn set_none(&self) -> Exit<Option<T>, E> {
        self.modify(|previous| (previous, None)).await
    }
}

impl<K, V, E> RefSubject<HashMap<K, V>, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Insert an entry, returning the value it replaced.
    pub async fn insert(&self, key: K, value: V) -> Exit<Option<V>, E> {
        self.modify(|mut map| (map.insert(key, value), map)).await
    }

    /// Remove an entry, returning its value.
    pub async fn remove_key(&self, key: &K) -> Exit<Option<V>, E> {
        self.modify(|mut map| (map.remove(key), map)).await
    }
}
