//! SkipRepeats combinator - drop consecutive duplicates.

use std::future::Future;
use std::sync::Mutex;

use crate::cause::Cause;
use crate::equivalence::Equivalence;
use crate::fx::trait_def::Fx;
use crate::scope::lock;
use crate::sink::Sink;

/// SkipRepeats combinator - drops a value when it is equivalent to the one
/// emitted just before it.
///
/// Created by [`FxExt::skip_repeats`](crate::FxExt::skip_repeats) and
/// [`FxExt::skip_repeats_with`](crate::FxExt::skip_repeats_with).
///
/// ```rust
/// use undertow::prelude::*;
///
/// # tokio_test::block_on(async {
/// let fx = from_iterable::<_, String>(vec![1, 1, 2, 2, 1]).skip_repeats();
/// assert_eq!(fx.collect_all().await, Ok(vec![1, 2, 1]));
/// # });
/// ```
#[derive(Debug)]
pub struct SkipRepeats<Inner, A> {
    pub(crate) inner: Inner,
    pub(crate) eq: Equivalence<A>,
}

struct SkipRepeatsSink<S, A> {
    sink: S,
    eq: Equivalence<A>,
    last: Mutex<Option<A>>,
}

impl<A, E, S> Sink<A, E> for SkipRepeatsSink<S, A>
where
    A: Clone + Send + 'static,
    E: Send + 'static,
    S: Sink<A, E>,
{
    async fn on_success(&self, value: A) {
        let changed = {
            let mut last = lock(&self.last);
            let repeated = last
                .as_ref()
                .is_some_and(|previous| self.eq.equals(previous, &value));
            if !repeated {
                *last = Some(value.clone());
            }
            !repeated
        };
        if changed {
            self.sink.on_success(value).await;
        }
    }

    fn on_failure(&self, cause: Cause<E>) -> impl Future<Output = ()> + Send {
        self.sink.on_failure(cause)
    }
}

impl<Inner> Fx for SkipRepeats<Inner, Inner::Output>
where
    Inner: Fx,
    Inner::Output: Clone,
{
    type Output = Inner::Output;
    type Error = Inner::Error;

    fn run<S>(&self, sink: S) -> impl Future<Output = ()> + Send
    where
        S: Sink<Self::Output, Self::Error>,
    {
        self.inner.run(SkipRepeatsSink {
            sink,
            eq: self.eq.clone(),
            last: Mutex::new(None),
        })
    }
}
