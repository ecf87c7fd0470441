//! Merge combinators - run several streams at once into one sink.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::cause::Cause;
use crate::fx::concurrency::{fork_guarded, scoped};
use crate::fx::trait_def::Fx;
use crate::scope::lock;
use crate::sink::{Sink, Terminal};

/// MergeAll combinator - runs every stream of a collection concurrently.
///
/// Each branch keeps its own order; the interleaving across branches is
/// whatever the runtime produces.
///
/// A typed failure or a defect in any branch ends the whole merge. An
/// interruption that reaches a branch only ends that branch, so an
/// interruption delivered to every sibling at once does not cut the
/// survivors short; once all branches have ended, a single interruption is
/// forwarded.
///
/// Created by [`merge_all`](crate::fx::merge_all).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let merged = merge_all(vec![
///     from_iterable::<_, String>(vec![1, 2]),
///     from_iterable(vec![3, 4]),
/// ]);
/// let mut values = merged.collect_all().await.unwrap();
/// values.sort();
/// assert_eq!(values, vec![1, 2, 3, 4]);
/// # });
/// ```
#[derive(Debug)]
pub struct MergeAll<X> {
    pub(crate) branches: Arc<Vec<X>>,
}

/// Merge combinator - runs two streams concurrently.
///
/// Same failure policy as [`MergeAll`].
///
/// Created by [`FxExt::merge`](crate::FxExt::merge).
#[derive(Debug)]
pub struct Merge<L, R> {
    pub(crate) left: Arc<L>,
    pub(crate) right: Arc<R>,
}

struct Branches<E> {
    remaining: AtomicUsize,
    interrupted: Mutex<Option<Cause<E>>>,
}

impl<E> Branches<E> {
    fn new(count: usize) -> Arc<Self> {
        Arc::new(Branches {
            remaining: AtomicUsize::new(count),
            interrupted: Mutex::new(None),
        })
    }
}

struct BranchSink<S, E> {
    sink: Arc<Terminal<S>>,
    branches: Arc<Branches<E>>,
}

impl<S, E> BranchSink<S, E>
where
    E: Send + 'static,
{
    /// Record that this branch ended; the last one forwards a pending
    /// interruption.
    async fn finish<A>(self)
    where
        A: Send + 'static,
        S: Sink<A, E>,
    {
        if self.branches.remaining.fetch_sub(1, Ordering::SeqCst) != 1 {
            return;
        }
        let interrupted = lock(&self.branches.interrupted).take();
        if let Some(cause) = interrupted {
            Sink::<A, E>::on_failure(&*self.sink, cause).await;
        }
    }
}

impl<A, E, S> Sink<A, E> for BranchSink<S, E>
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    async fn on_success(&self, value: A) {
        self.sink.on_success(value).await
    }

    async fn on_failure(&self, cause: Cause<E>) {
        if !cause.is_interrupted_only() {
            return self.sink.on_failure(cause).await;
        }
        let mut interrupted = lock(&self.branches.interrupted);
        if interrupted.is_none() {
            *interrupted = Some(cause);
        } else {
            tracing::trace!("merge: skipping duplicate interruption");
        }
    }
}

fn branch<S, E>(sink: &Arc<Terminal<S>>, branches: &Arc<Branches<E>>) -> BranchSink<S, E> {
    BranchSink {
        sink: Arc::clone(sink),
        branches: Arc::clone(branches),
    }
}

impl<X: Fx> Fx for MergeAll<X> {
    type Output = X::Output;
    type Error = X::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let count = self.branches.len();
        scoped(sink, |sink, scope| async move {
            let branches = Branches::new(count);
            for index in 0..count {
                let sources = Arc::clone(&self.branches);
                let branch_sink = branch(&sink, &branches);
                let finish = branch(&sink, &branches);
                fork_guarded::<X::Output, X::Error, _, _>(&scope, &sink, async move {
                    sources[index].run(branch_sink).await;
                    finish.finish::<X::Output>().await;
                });
            }
        })
        .await
    }
}

impl<L, R> Fx for Merge<L, R>
where
    L: Fx,
    R: Fx<Output = L::Output, Error = L::Error>,
{
    type Output = L::Output;
    type Error = L::Error;

    async fn run<S>(&self, sink: S)
    where
        S: Sink<Self::Output, Self::Error>,
    {
        scoped(sink, |sink, scope| async move {
            let branches = Branches::new(2);

            let left = Arc::clone(&self.left);
            let (left_sink, left_finish) = (branch(&sink, &branches), branch(&sink, &branches));
            fork_guarded::<L::Output, L::Error, _, _>(&scope, &sink, async move {
                left.run(left_sink).await;
                left_finish.finish::<L::Output>().await;
            });

            let right = Arc::clone(&self.right);
            let (right_sink, right_finish) = (branch(&sink, &branches), branch(&sink, &branches));
            fork_guarded::<L::Output, L::Error, _, _>(&scope, &sink, async move {
                right.run(right_sink).await;
                right_finish.finish::<L::Output>().await;
            });
        })
        .await
    }
}
