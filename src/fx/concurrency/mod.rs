//! Concurrency combinators.
//!
//! Every combinator here opens one [`Scope`] per subscription and forks its
//! inner work into it. Two guarantees hold for all of them:
//!
//! - the subscription does not complete before every fiber it forked has
//!   finished, been interrupted, or been joined;
//! - a failure, an early stop or the subscription being dropped closes the
//!   scope, which interrupts every fiber still running.
//!
//! They differ in what happens when a new value arrives while inner work is
//! still running:
//!
//! | Combinator | On overlap |
//! |---|---|
//! | [`FlatMap`] | run every inner stream, optionally bounded by [`Concurrency`](crate::Concurrency) |
//! | [`SwitchMap`] | interrupt the running inner stream, start the new one |
//! | [`ExhaustMap`] | drop the new value |
//! | [`ExhaustLatestMap`] | keep the newest value, run it when the current one ends |

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::cause::{Cause, Defect};
use crate::scope::{Fiber, Scope, ScopeHandle};
use crate::sink::{Sink, Terminal};

mod combine;
mod exhaust_latest_map;
mod exhaust_map;
mod flat_map;
mod merge;
mod retry;
mod switch_map;

pub use combine::{Combine, CombineAll, StructOf};
pub use exhaust_latest_map::ExhaustLatestMap;
pub use exhaust_map::ExhaustMap;
pub use flat_map::FlatMap;
pub use merge::{Merge, MergeAll};
pub use retry::Retry;
pub use switch_map::SwitchMap;

/// Run one scoped subscription.
///
/// `body` subscribes upstream and forks into the scope it is given. The
/// subscription lasts until `body` and every fiber forked into the scope
/// have finished, or until the terminal sink stops it; the scope is closed
/// in every case.
pub(crate) async fn scoped<S, F, Fut>(sink: S, body: F)
where
    F: FnOnce(Arc<Terminal<S>>, ScopeHandle) -> Fut,
    Fut: Future<Output = ()>,
{
    let scope = Scope::new();
    let terminal = Arc::new(Terminal::new(sink));
    let handle = scope.handle();
    terminal
        .drive(async {
            body(Arc::clone(&terminal), handle.clone()).await;
            handle.await_idle().await;
        })
        .await;
    scope.close().await;
}

/// Await `work`, delivering a panic raised inside it to `sink` as a
/// [`Cause::Die`]. Returns `false` when `work` panicked.
pub(crate) async fn guarded<A, E, S, F>(sink: &Terminal<S>, work: F) -> bool
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(()) => true,
        Err(payload) => {
            let defect = Defect::from_panic(payload);
            tracing::warn!(defect = %defect, "inner stream panicked");
            Sink::<A, E>::on_failure(sink, Cause::die(defect)).await;
            false
        }
    }
}

/// Fork `work` into `scope` under [`guarded`].
pub(crate) fn fork_guarded<A, E, S, F>(scope: &ScopeHandle, sink: &Arc<Terminal<S>>, work: F) -> Fiber
where
    A: Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
    F: Future<Output = ()> + Send + 'static,
{
    let sink = Arc::clone(sink);
    scope.fork(async move {
        guarded::<A, E, _, _>(&sink, work).await;
    })
}
