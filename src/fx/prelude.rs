//! Prelude module for convenient imports.
//!
//! Re-exports the traits, constructors and core types needed to build and
//! run producers with a single `use` statement.
//!
//! ```rust
//! use undertow::fx::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let fx = from_iterable::<_, String>(vec![1, 2, 3]).map(|n| n + 1);
//! assert_eq!(fx.collect_all().await, Ok(vec![2, 3, 4]));
//! # });
//! ```
//!
//! The free function [`make`](crate::fx::make) is left out because
//! [`sink::make`](crate::sink::make) shares its name; import whichever one
//! you need by path.

// Traits
pub use crate::fx::ext::FxExt;
pub use crate::fx::tracing::FxTracingExt;
pub use crate::fx::trait_def::Fx;
pub use crate::sink::Sink;

// Boxed types
pub use crate::fx::boxed::BoxedFx;
pub use crate::sink::BoxedSink;

// Failure channel
pub use crate::cause::{Cause, Defect, Exit, FiberId};

// Configuration and change detection
pub use crate::equivalence::Equivalence;
pub use crate::schedule::{Concurrency, Schedule};

// Constructors
pub use crate::fx::constructors::{
    at, die, empty, fail, fail_cause, from_effect, from_exit, from_future, from_iterable,
    from_schedule, never, periodic, sleep, succeed, suspend, unwrap, unwrap_scoped,
};
pub use crate::fx::{combine, combine_all, merge_all, struct_of};

// Runner handle
pub use crate::fx::runners::FxFiber;
