//! The consumer side of a stream.
//!
//! A [`Sink`] receives the notifications of one subscription: any number of
//! [`on_success`](Sink::on_success) calls followed by at most one
//! [`on_failure`](Sink::on_failure), which terminates the subscription.
//! Successful completion is not a notification: the subscription's future
//! simply finishes.
//!
//! # Module Structure
//!
//! - [`Sink`] - the two-callback consumer trait
//! - [`BoxedSink`] - a type-erased, cloneable sink
//! - [`make`] - build a sink from two async closures
//! - [`drain`] - a sink that discards everything
//!
//! # Example
//!
//! ```rust
//! use undertow::prelude::*;
//! use std::sync::{Arc, Mutex};
//!
//! # tokio_test::block_on(async {
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let log = seen.clone();
//!
//! let sink = undertow::sink::make(
//!     move |n: i32| {
//!         log.lock().unwrap().push(n);
//!         async {}
//!     },
//!     |_cause: Cause<String>| async {},
//! );
//!
//! from_iterable(vec![1, 2, 3]).run(sink).await;
//! assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3]);
//! # });
//! ```

mod boxed;
mod make;
mod terminal;
mod trait_def;

pub use boxed::BoxedSink;
pub use make::{drain, make, Drain, FnSink};
pub use trait_def::Sink;

pub(crate) use terminal::Terminal;
