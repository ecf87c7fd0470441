//! Combine combinators - latest value of every input, as one value.
//!
//! A combined value is emitted once every input has produced at least one
//! value, then again each time any input produces a new one. Inputs run
//! concurrently; updates to the shared slots and the emission that follows
//! happen under one lock, so emissions always reflect the latest slots in
//! the order the updates happened.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::cause::Cause;
use crate::fx::concurrency::{fork_guarded, scoped};
use crate::fx::trait_def::Fx;
use crate::sink::{Sink, Terminal};

type Setter<St, A> = Arc<dyn Fn(&mut St, A) + Send + Sync>;
type Emitter<St, O> = Arc<dyn Fn(&St) -> Option<O> + Send + Sync>;

struct SlotSink<S, St, A, O> {
    sink: Arc<Terminal<S>>,
    slots: Arc<Mutex<St>>,
    set: Setter<St, A>,
    emit: Emitter<St, O>,
}

impl<A, E, O, S, St> Sink<A, E> for SlotSink<S, St, A, O>
where
    A: Send + 'static,
    E: Send + 'static,
    O: Send + 'static,
    St: Send + 'static,
    S: Sink<O, E>,
{
    async fn on_success(&self, value: A) {
        if self.sink.is_done() {
            return;
        }
        let mut slots = self.slots.lock().await;
        (self.set)(&mut slots, value);
        if let Some(combined) = (self.emit)(&slots) {
            Sink::<O, E>::on_success(&*self.sink, combined).await;
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        Sink::<O, E>::on_failure(&*self.sink, cause)
    }
}

fn setter<St, A>(_slots: &Arc<Mutex<St>>, set: fn(&mut St, A)) -> Setter<St, A>
where
    St: 'static,
    A: 'static,
{
    Arc::new(set)
}

fn emitter<St, O>(_slots: &Arc<Mutex<St>>, emit: fn(&St) -> Option<O>) -> Emitter<St, O>
where
    St: 'static,
    O: 'static,
{
    Arc::new(emit)
}

/// Combine combinator - combines a tuple of 2 to 4 streams.
///
/// Created by [`combine`](crate::fx::combine) and
/// [`FxExt::combine`](crate::FxExt::combine).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = combine((succeed::<_, String>(1), succeed("one")));
/// assert_eq!(fx.collect_all().await, Ok(vec![(1, "one")]));
/// # });
/// ```
#[derive(Debug)]
pub struct Combine<T> {
    pub(crate) sources: Arc<T>,
}

macro_rules! combine_tuple {
    ($($X:ident $idx:tt),+) => {
        impl<Err, $($X),+> Fx for Combine<($($X,)+)>
        where
            Err: Send + 'static,
            $($X: Fx<Error = Err>, $X::Output: Clone,)+
        {
            type Output = ($($X::Output,)+);
            type Error = Err;

            async fn run<S>(&self, sink: S)
            where
                S: Sink<Self::Output, Self::Error>,
            {
                let slots = Arc::new(Mutex::new(($(None::<$X::Output>,)+)));
                let emit = emitter(&slots, |slots| Some(($(slots.$idx.clone()?,)+)));
                scoped(sink, |sink, scope| async move {
                    $(
                        let slot = SlotSink {
                            sink: Arc::clone(&sink),
                            slots: Arc::clone(&slots),
                            set: setter(&slots, |slots, value| slots.$idx = Some(value)),
                            emit: Arc::clone(&emit),
                        };
                        let sources = Arc::clone(&self.sources);
                        fork_guarded::<Self::Output, Err, _, _>(
                            &scope,
                            &sink,
                            async move { sources.$idx.run(slot).await },
                        );
                    )+
                })
                .await
            }
        }
    };
}

combine_tuple!(X0 0, X1 1);
combine_tuple!(X0 0, X1 1, X2 2);
combine_tuple!(X0 0, X1 1, X2 2, X3 3);

/// CombineAll combinator - combines a collection of streams into a vector
/// of their latest values, in input order.
///
/// Created by [`combine_all`](crate::fx::combine_all).
#[derive(Debug)]
pub struct CombineAll<X> {
    pub(crate) sources: Arc<Vec<X>>,
}

/// StructOf combinator - combines keyed streams into a map of their latest
/// values.
///
/// Created by [`struct_of`](crate::fx::struct_of).
///
/// ```rust
/// use undertow::prelude::*;
/// use std::collections::BTreeMap;
///
/// # tokio_test::block_on(async {
/// let fx = struct_of(BTreeMap::from([
///     ("x", from_iterable::<_, String>(vec![1])),
///     ("y", from_iterable(vec![2])),
/// ]));
/// let maps = fx.collect_all().await.unwrap();
/// assert_eq!(maps, vec![BTreeMap::from([("x", 1), ("y", 2)])]);
/// # });
/// ```
#[derive(Debug)]
pub struct StructOf<K, X> {
    pub(crate) keys: Arc<Vec<K>>,
    pub(crate) sources: Arc<Vec<X>>,
}

async fn run_indexed<X, S, O>(sources: &Arc<Vec<X>>, sink: S, emit: Emitter<Vec<Option<X::Output>>, O>)
where
    X: Fx,
    X::Output: Clone,
    O: Send + 'static,
    S: Sink<O, X::Error>,
{
    let slots = Arc::new(Mutex::new(
        (0..sources.len()).map(|_| None).collect::<Vec<Option<X::Output>>>(),
    ));
    scoped(sink, |sink, scope| async move {
        for index in 0..sources.len() {
            let set: Setter<Vec<Option<X::Output>>, X::Output> =
                Arc::new(move |slots: &mut Vec<Option<X::Output>>, value: X::Output| {
                    slots[index] = Some(value)
                });
            let slot = SlotSink {
                sink: Arc::clone(&sink),
                slots: Arc::clone(&slots),
                set,
                emit: Arc::clone(&emit),
            };
            let sources = Arc::clone(sources);
            fork_guarded::<O, X::Error, _, _>(
                &scope,
                &sink,
                async move { sources[index].run(slot).await },
            );
        }
    })
    .await
}

impl<X> Fx for CombineAll<X>
where
    X: Fx,
    X::Output: Clone,
{
    type Output = Vec<X::Output>;
    type Error = X::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let emit: Emitter<Vec<Option<X::Output>>, Vec<X::Output>> =
            Arc::new(|slots: &Vec<Option<X::Output>>| slots.iter().cloned().collect());
        run_indexed(&self.sources, sink, emit)
    }
}

impl<K, X> Fx for StructOf<K, X>
where
    K: Ord + Clone + Send + Sync + 'static,
    X: Fx,
    X::Output: Clone,
{
    type Output = BTreeMap<K, X::Output>;
    type Error = X::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        let keys = Arc::clone(&self.keys);
        let emit: Emitter<Vec<Option<X::Output>>, BTreeMap<K, X::Output>> =
            Arc::new(move |slots: &Vec<Option<X::Output>>| {
                keys.iter()
                    .zip(slots)
                    .map(|(key, slot)| Some((key.clone(), slot.clone()?)))
                    .collect()
            });
        run_indexed(&self.sources, sink, emit)
    }
}
