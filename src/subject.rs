//! Subject - a hot, multicast producer that is also a sink.
//!
//! Values pushed into a [`Subject`] through its [`Sink`] side are delivered
//! to every subscription currently attached through its [`Fx`] side. A
//! subject created with [`Subject::replay`] also remembers the last `n`
//! values and hands them, oldest first, to each new subscriber before any
//! live value.
//!
//! A failure pushed into the subject is delivered to every attached
//! subscriber and ends their subscriptions. [`Subject::complete`] ends them
//! without a failure. A subscription still being replayed to when either
//! happens ends the same way instead of attaching.
//!
//! # Example
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let subject = Subject::<i32, String>::replay(2);
//! for n in [1, 2, 3] {
//!     subject.on_success(n).await;
//! }
//!
//! let late = subject.clone().take(2);
//! assert_eq!(late.collect_all().await, Ok(vec![2, 3]));
//! # });
//! ```

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::cause::{Cause, FiberId};
use crate::fx::Fx;
use crate::ring_buffer::RingBuffer;
use crate::scope::{lock, ExitSignal};
use crate::sink::{BoxedSink, Sink, Terminal};

/// A multicast [`Fx`] fed through its [`Sink`] implementation.
///
/// Cloning is cheap; clones share subscribers and replay buffer.
pub struct Subject<A, E> {
    inner: Arc<Inner<A, E>>,
}

struct Inner<A, E> {
    state: Mutex<State<A, E>>,
}

struct State<A, E> {
    subscribers: Vec<Subscriber<A, E>>,
    buffer: RingBuffer<A>,
    /// Total number of values ever pushed.
    pushed: u64,
    next_id: u64,
    /// Bumped by every completion or failure.
    generation: u64,
    ending: Option<Ending<E>>,
}

/// How the subject last ended its subscriptions.
#[derive(Clone)]
enum Ending<E> {
    Complete,
    Fail(Cause<E>),
}

/// One round of [`Subject::attach`].
enum Step<A, E> {
    Replay(Vec<A>),
    Attached(u64, ExitSignal),
    Ended(Ending<E>),
}

struct Subscriber<A, E> {
    id: u64,
    sink: BoxedSink<A, E>,
    signal: ExitSignal,
}

impl<A, E> Clone for Subject<A, E> {
    fn clone(&self) -> Self {
        Subject {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, E> fmt::Debug for Subject<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("Subject")
            .field("subscribers", &state.subscribers.len())
            .field("capacity", &state.buffer.capacity())
            .finish()
    }
}

impl<A, E> Default for Subject<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<A, E> Subject<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// A subject without replay, accepting any number of subscribers.
    pub fn unbounded() -> Self {
        Self::with_capacity(0)
    }

    /// A subject replaying the last `n` values to each new subscriber.
    pub fn replay(n: usize) -> Self {
        Self::with_capacity(n)
    }

    /// Same as [`Subject::replay`].
    pub fn with_capacity(capacity: usize) -> Self {
        Subject {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    subscribers: Vec::new(),
                    buffer: RingBuffer::new(capacity),
                    pushed: 0,
                    next_id: 0,
                    generation: 0,
                    ending: None,
                }),
            }),
        }
    }

    /// Number of attached subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.state).subscribers.len()
    }

    /// The values a new subscriber would be replayed, oldest first.
    pub fn replayed(&self) -> Vec<A> {
        lock(&self.inner.state).buffer.to_vec()
    }

    /// End every attached subscription successfully.
    pub fn complete(&self) {
        let subscribers = self.end(Ending::Complete);
        tracing::debug!(subscribers = subscribers.len(), "subject completed");
        for subscriber in subscribers {
            subscriber.signal.fire();
        }
    }

    /// Send an interrupt to every attached subscription, ending them.
    pub async fn interrupt(&self) {
        self.fail_all(Cause::interrupt(FiberId::current())).await
    }

    /// Remember `value` for replay without delivering it.
    pub(crate) fn seed(&self, value: A) {
        let mut state = lock(&self.inner.state);
        state.buffer.push(value);
        state.pushed += 1;
    }

    /// Drop the replay buffer.
    pub(crate) fn forget(&self) {
        lock(&self.inner.state).buffer.clear();
    }

    async fn push(&self, value: A) {
        let sinks: Vec<_> = {
            let mut state = lock(&self.inner.state);
            state.buffer.push(value.clone());
            state.pushed += 1;
            state
                .subscribers
                .iter()
                .map(|subscriber| subscriber.sink.clone())
                .collect()
        };
        for sink in sinks {
            sink.on_success(value.clone()).await;
        }
    }

    /// Detach every subscriber and record `ending` for subscriptions that
    /// are still replaying.
    fn end(&self, ending: Ending<E>) -> Vec<Subscriber<A, E>> {
        let mut state = lock(&self.inner.state);
        state.generation += 1;
        state.ending = Some(ending);
        std::mem::take(&mut state.subscribers)
    }

    async fn fail_all(&self, cause: Cause<E>) {
        let subscribers = self.end(Ending::Fail(cause.clone()));
        tracing::debug!(subscribers = subscribers.len(), "subject failed");
        for subscriber in subscribers {
            subscriber.sink.on_failure(cause.clone()).await;
            subscriber.signal.fire();
        }
    }

    /// Replay the buffer to `sink`, then attach it.
    ///
    /// Values pushed while replaying are caught up before attaching, so the
    /// subscriber sees every value exactly once and in order. Returns `None`
    /// when the subject completed or failed before the subscriber attached;
    /// a failure has then already been delivered to `sink`.
    async fn attach(&self, sink: BoxedSink<A, E>) -> Option<(u64, ExitSignal)> {
        let mut seen: Option<u64> = None;
        let mut generation: Option<u64> = None;
        loop {
            let step = {
                let mut state = lock(&self.inner.state);
                let started = *generation.get_or_insert(state.generation);
                if state.generation != started {
                    Step::Ended(state.ending.clone().unwrap_or(Ending::Complete))
                } else {
                    Self::catch_up(&mut state, &mut seen, &sink)
                }
            };
            match step {
                Step::Replay(backlog) => {
                    for value in backlog {
                        sink.on_success(value).await;
                    }
                }
                Step::Attached(id, signal) => return Some((id, signal)),
                Step::Ended(ending) => {
                    tracing::trace!("subject ended before the subscriber attached");
                    if let Ending::Fail(cause) = ending {
                        sink.on_failure(cause).await;
                    }
                    return None;
                }
            }
        }
    }

    /// Either the values `sink` still has to be replayed, or, when it is
    /// caught up, attach it.
    fn catch_up(
        state: &mut State<A, E>,
        seen: &mut Option<u64>,
        sink: &BoxedSink<A, E>,
    ) -> Step<A, E> {
        let missed = match *seen {
            None => state.buffer.len(),
            Some(seen) => {
                let behind = usize::try_from(state.pushed - seen).unwrap_or(usize::MAX);
                behind.min(state.buffer.len())
            }
        };
        if missed == 0 {
            let id = state.next_id;
            state.next_id += 1;
            let signal = ExitSignal::new();
            state.subscribers.push(Subscriber {
                id,
                sink: sink.clone(),
                signal: signal.clone(),
            });
            return Step::Attached(id, signal);
        }
        *seen = Some(state.pushed);
        let skip = state.buffer.len() - missed;
        Step::Replay(state.buffer.iter().skip(skip).cloned().collect())
    }
}

/// Removes a subscriber when its subscription future is dropped.
struct Detach<A, E> {
    inner: Arc<Inner<A, E>>,
    id: u64,
}

impl<A, E> Drop for Detach<A, E> {
    fn drop(&mut self) {
        lock(&self.inner.state)
            .subscribers
            .retain(|subscriber| subscriber.id != self.id);
    }
}

impl<A, E> Fx for Subject<A, E>
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
        let terminal = Arc::new(Terminal::new(sink));
        let Some((id, signal)) = self.attach(BoxedSink::new(Arc::clone(&terminal))).await else {
            return;
        };
        let _detach = Detach {
            inner: Arc::clone(&self.inner),
            id,
        };
        tracing::trace!(subscriber = id, "subject subscribed");
        signal.fired().await;
    }
}

impl<A, E> Sink<A, E> for Subject<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn on_success(&self, value: A) -> impl Future<Output = ()> + Send {
        self.push(value)
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.fail_all(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::prelude::*;
    use std::time::Duration;

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn replay_is_bounded() {
        let subject = Subject::<i32, String>::replay(2);
        for n in [1, 2, 3] {
            subject.on_success(n).await;
        }
        assert_eq!(subject.replayed(), vec![2, 3]);

        let handle = tokio::spawn({
            let subject = subject.clone();
            async move { subject.collect_all().await }
        });
        settle().await;
        subject.complete();
        assert_eq!(handle.await.unwrap(), Ok(vec![2, 3]));
    }

    #[tokio::test]
    async fn live_values_reach_every_subscriber() {
        let subject = Subject::<i32, String>::unbounded();
        let first = tokio::spawn({
            let subject = subject.clone();
            async move { subject.collect_all().await }
        });
        let second = tokio::spawn({
            let subject = subject.clone();
            async move { subject.collect_all().await }
        });
        settle().await;
        assert_eq!(subject.subscriber_count(), 2);

        subject.on_success(1).await;
        subject.on_success(2).await;
        subject.complete();

        assert_eq!(first.await.unwrap(), Ok(vec![1, 2]));
        assert_eq!(second.await.unwrap(), Ok(vec![1, 2]));
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn failure_ends_subscriptions() {
        let subject = Subject::<i32, String>::unbounded();
        let subscriber = tokio::spawn({
            let subject = subject.clone();
            async move { subject.collect_all().await }
        });
        settle().await;

        subject.on_failure(Cause::fail("closed".to_string())).await;
        assert_eq!(
            subscriber.await.unwrap(),
            Err(Cause::fail("closed".to_string()))
        );
    }

    #[tokio::test]
    async fn interrupt_reaches_every_subscriber() {
        let subject = Subject::<i32, String>::unbounded();
        let subscribers: Vec<_> = (0..2)
            .map(|_| {
                let subject = subject.clone();
                tokio::spawn(async move { subject.collect_all().await })
            })
            .collect();
        settle().await;

        subject.interrupt().await;
        for subscriber in subscribers {
            assert!(subscriber.await.unwrap().unwrap_err().is_interrupted());
        }
    }

    #[tokio::test]
    async fn dropped_subscription_detaches() {
        let subject = Subject::<i32, String>::unbounded();
        let taken = tokio::spawn({
            let subject = subject.clone();
            async move { subject.take(1).collect_all().await }
        });
        settle().await;
        assert_eq!(subject.subscriber_count(), 1);

        subject.on_success(9).await;
        assert_eq!(taken.await.unwrap(), Ok(vec![9]));
        assert_eq!(subject.subscriber_count(), 0);
    }

    async fn slow_subscriber(subject: &Subject<i32, String>) -> tokio::task::JoinHandle<Exit<(), String>> {
        let subject = subject.clone();
        let handle = tokio::spawn(async move {
            subject
                .observe(|_| async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(())
                })
                .await
        });
        settle().await;
        handle
    }

    #[tokio::test(start_paused = true)]
    async fn complete_ends_a_subscriber_still_replaying() {
        let subject = Subject::<i32, String>::replay(1);
        subject.on_success(1).await;

        let replaying = slow_subscriber(&subject).await;
        assert_eq!(subject.subscriber_count(), 0);
        subject.complete();

        let exit = tokio::time::timeout(Duration::from_secs(5), replaying).await;
        assert_eq!(exit.unwrap().unwrap(), Ok(()));
        assert_eq!(subject.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_reaches_a_subscriber_still_replaying() {
        let subject = Subject::<i32, String>::replay(1);
        subject.on_success(1).await;

        let replaying = slow_subscriber(&subject).await;
        subject.on_failure(Cause::fail("closed".to_string())).await;

        let exit = tokio::time::timeout(Duration::from_secs(5), replaying).await;
        assert_eq!(exit.unwrap().unwrap(), Err(Cause::fail("closed".to_string())));
    }

    #[tokio::test]
    async fn subscribers_after_completion_attach() {
        let subject = Subject::<i32, String>::replay(1);
        subject.on_success(1).await;
        subject.complete();

        let late = tokio::spawn({
            let subject = subject.clone();
            async move { subject.take(2).collect_all().await }
        });
        settle().await;
        assert_eq!(subject.subscriber_count(), 1);

        subject.on_success(2).await;
        assert_eq!(late.await.unwrap(), Ok(vec![1, 2]));
    }

    #[tokio::test(start_paused = true)]
    async fn no_replay_without_capacity() {
        let subject = Subject::<i32, String>::unbounded();
        subject.on_success(1).await;
        assert!(subject.replayed().is_empty());

        let late = tokio::time::timeout(Duration::from_millis(10), subject.first()).await;
        assert!(late.is_err());
    }
}
