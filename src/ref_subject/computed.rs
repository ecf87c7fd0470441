//! Read-only cells derived from a [`RefSubject`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::cause::Exit;
use crate::equivalence::Equivalence;
use crate::fx::{BoxedFx, Fx, FxExt};
use crate::ref_subject::RefSubject;
use crate::sink::Sink;

type Read<B, E> = Arc<dyn Fn() -> BoxFuture<'static, Exit<B, E>> + Send + Sync>;

/// A value computed from a [`RefSubject`].
///
/// Reading a `Computed` reads its source and applies the mapping. As an
/// [`Fx`] it emits the mapped value of every change of the source, skipping
/// results equivalent to the previous one.
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let name = RefSubject::<String>::of("ada".to_string());
/// let length = name.computed(|s| s.len());
///
/// assert_eq!(length.get().await, Ok(3));
/// name.set("grace".to_string()).await;
/// assert_eq!(length.get().await, Ok(5));
/// # });
/// ```
pub struct Computed<B, E> {
    read: Read<B, E>,
    changes: BoxedFx<B, E>,
}

impl<B, E> Clone for Computed<B, E> {
    fn clone(&self) -> Self {
        Computed {
            read: Arc::clone(&self.read),
            changes: self.changes.clone(),
        }
    }
}

impl<B, E> fmt::Debug for Computed<B, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed").finish_non_exhaustive()
    }
}

impl<B, E> Computed<B, E>
where
    B: Send + 'static,
    E: Send + 'static,
{
    /// The current mapped value, waiting while the source is empty.
    pub fn get(&self) -> impl Future<Output = Exit<B, E>> + Send + 'static {
        (self.read)()
    }
}

impl<B, E> Fx for Computed<B, E>
where
    B: Send + 'static,
    E: Send + 'static,
{
    type Output = B;
    type Error = E;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<B, E>,
    {
        self.changes.run(sink)
    }
}

impl<A, E> RefSubject<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Derive a read-only cell, deduplicated with `==`.
    pub fn computed<B, F>(&self, f: F) -> Computed<B, E>
    where
        B: Clone + PartialEq + Send + Sync + 'static,
        F: Fn(&A) -> B + Send + Sync + 'static,
    {
        self.computed_with(f, Equivalence::strict())
    }

    /// Derive a read-only cell, deduplicated with `eq`.
    pub fn computed_with<B, F>(&self, f: F, eq: Equivalence<B>) -> Computed<B, E>
    where
        B: Clone + Send + Sync + 'static,
        F: Fn(&A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);

        let source = self.clone();
        let project = Arc::clone(&f);
        let read: Read<B, E> = Arc::new(move || -> BoxFuture<'static, Exit<B, E>> {
            let source = source.clone();
            let project = Arc::clone(&project);
            Box::pin(async move { source.get().await.map(|value| project(&value)) })
        });

        let changes = self
            .clone()
            .map(move |value: A| f(&value))
            .skip_repeats_with(eq)
            .boxed();

        Computed { read, changes }
    }
}
