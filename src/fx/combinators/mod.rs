//! Transformation combinators.
//!
//! Each combinator wraps an upstream producer and, when run, subscribes it
//! with an adapter sink that rewrites notifications on their way to the
//! downstream sink. Pure and effectful variants come in pairs (`Map` /
//! `MapEffect`): the effectful variant runs an async, fallible function, and a
//! failure of that function terminates the subscription.

mod catch;
mod concat;
mod filter;
mod loop_with;
mod map;
mod map_error;
mod materialize;
mod on_exit;
mod scan;
mod skip_repeats;
mod slice;
mod take_while;
mod tap;
mod until;

pub use catch::{Catch, CatchCause, CatchIf, OrElseSucceed};
pub use concat::{ContinueWith, StartWith};
pub use filter::{Filter, FilterEffect, FilterMap, FilterMapEffect};
pub use loop_with::{Loop, LoopEffect};
pub use map::{Map, MapEffect};
pub use map_error::{MapBoth, MapCause, MapError};
pub use materialize::{Causes, ExitOf, ResultOf};
pub use on_exit::{Always, Errored, ExitHook, Exited, Interrupted, OnExit};
pub use scan::{Scan, ScanEffect};
pub use skip_repeats::SkipRepeats;
pub use slice::{Bounds, Slice};
pub use take_while::{SkipWhile, TakeWhile};
pub use tap::{Tap, TapEffect};
pub use until::Until;

pub(crate) use take_while::Stop;
