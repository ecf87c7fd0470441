//! # Undertow
//!
//! Push-based reactive streams for Rust.
//!
//! ## Philosophy
//!
//! A stream is an inert description, an [`Fx`]. Nothing runs until it is
//! handed a [`Sink`]:
//! - **Producers** push values into the sink, then at most one failure
//! - **Sinks** receive those notifications
//! - **Scopes** own every task a running stream forks, and stop them together
//!
//! Failures travel as a [`Cause`], which keeps typed errors, defects and
//! interruptions apart and combines concurrent failures.
//!
//! ## Quick Example
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let fx = merge_all(vec![
//!     from_iterable::<_, String>(vec![1, 2]),
//!     from_iterable(vec![3, 4]),
//! ])
//! .scan(0, |total, n| total + n)
//! .skip(1);
//!
//! let totals = fx.collect_all().await.unwrap();
//! assert_eq!(totals.len(), 4);
//! assert_eq!(totals.last(), Some(&10));
//! # });
//! ```
//!
//! ## State
//!
//! [`RefSubject`] is an observable cell: reading it returns the current
//! value, running it as a stream yields the current value and then every
//! change.
//!
//! ```rust
//! use undertow::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let count = RefSubject::<i32>::of(0);
//! count.update(|n| n + 1).await.unwrap();
//! assert_eq!(count.get().await, Ok(1));
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod cause;
pub mod deferred_ref;
pub mod equivalence;
pub mod fx;
pub mod ref_subject;
pub mod ring_buffer;
pub mod schedule;
pub mod scope;
pub mod sink;
pub mod subject;
pub mod testing;

// Re-exports
pub use cause::{Cause, Defect, Exit, FiberId};
pub use deferred_ref::DeferredRef;
pub use equivalence::Equivalence;
pub use fx::{BoxedFx, Fx, FxExt, FxFiber, FxTracingExt};
pub use ref_subject::{
    Computed, RefBool, RefHashMap, RefNumber, RefOption, RefSubject, RefVec, Transaction,
};
pub use ring_buffer::RingBuffer;
pub use schedule::{Concurrency, JitterStrategy, Schedule, ScheduleStrategy};
pub use scope::{Fiber, Scope, ScopeHandle};
pub use sink::{BoxedSink, Sink};
pub use subject::Subject;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::deferred_ref::DeferredRef;
    pub use crate::fx::prelude::*;
    pub use crate::ref_subject::{
        Computed, RefBool, RefHashMap, RefNumber, RefOption, RefSubject, RefVec,
    };
    pub use crate::scope::{Scope, ScopeHandle};
    pub use crate::subject::Subject;
}
