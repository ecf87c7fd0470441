//! Recurrence schedules and concurrency settings.
//!
//! A [`Schedule`] is pure data: it describes the delay before each recurrence
//! of something (a periodic tick, a re-subscription after failure) without
//! performing any waiting itself. This keeps schedules easy to test, clone and
//! inspect.
//!
//! # Example
//!
//! ```rust
//! use undertow::Schedule;
//! use std::time::Duration;
//!
//! let schedule = Schedule::exponential(Duration::from_millis(10))
//!     .with_max_recurrences(3);
//!
//! let delays: Vec<_> = schedule.recurrences().collect();
//! assert_eq!(
//!     delays,
//!     vec![
//!         Duration::from_millis(10),
//!         Duration::from_millis(20),
//!         Duration::from_millis(40),
//!     ]
//! );
//! ```

use std::num::NonZeroUsize;
use std::time::Duration;

/// A description of recurrence delays.
///
/// Unlike a retry policy, a schedule may be unbounded: `Schedule::spaced(d)`
/// ticks forever, which is what periodic polling wants.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    strategy: ScheduleStrategy,
    max_recurrences: Option<u32>,
    max_delay: Option<Duration>,
    jitter: JitterStrategy,
}

/// How the delay grows between recurrences.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleStrategy {
    /// Same delay every time.
    Spaced(Duration),
    /// Delay grows linearly: base * (n + 1).
    Linear {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay doubles: base * 2^n.
    Exponential {
        /// Base delay duration.
        base: Duration,
    },
    /// Delay follows the Fibonacci sequence: base * fib(n + 1).
    Fibonacci {
        /// Base delay duration.
        base: Duration,
    },
}

/// Randomness added to delays.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JitterStrategy {
    /// No jitter.
    #[default]
    None,
    /// Add up to ±factor of the delay.
    Proportional(f64),
    /// Random delay between zero and the computed delay.
    Full,
}

impl Schedule {
    /// Recur forever with the same delay.
    ///
    /// ```rust
    /// use undertow::Schedule;
    /// use std::time::Duration;
    ///
    /// let schedule = Schedule::spaced(Duration::from_secs(1));
    /// assert_eq!(schedule.delay_for(0), Some(Duration::from_secs(1)));
    /// assert_eq!(schedule.delay_for(1_000), Some(Duration::from_secs(1)));
    /// ```
    pub fn spaced(delay: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Spaced(delay))
    }

    /// Alias of [`Schedule::spaced`].
    pub fn fixed(delay: Duration) -> Self {
        Self::spaced(delay)
    }

    /// Linearly growing delay.
    pub fn linear(base: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Linear { base })
    }

    /// Exponentially growing delay.
    pub fn exponential(base: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Exponential { base })
    }

    /// Fibonacci-growing delay.
    pub fn fibonacci(base: Duration) -> Self {
        Self::with_strategy(ScheduleStrategy::Fibonacci { base })
    }

    fn with_strategy(strategy: ScheduleStrategy) -> Self {
        Self {
            strategy,
            max_recurrences: None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Stop after `n` recurrences.
    pub fn with_max_recurrences(mut self, n: u32) -> Self {
        self.max_recurrences = Some(n);
        self
    }

    /// Never wait longer than `d`.
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Add ±`factor` proportional jitter (clamped to `0.0..=1.0`).
    ///
    /// Requires the `jitter` feature; without it jitter is ignored.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        self.jitter = JitterStrategy::Proportional(factor.clamp(0.0, 1.0));
        self
    }

    /// Use full jitter: a random delay between zero and the computed delay.
    ///
    /// Requires the `jitter` feature; without it jitter is ignored.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Maximum number of recurrences, if bounded.
    pub fn max_recurrences(&self) -> Option<u32> {
        self.max_recurrences
    }

    /// Delay cap, if any.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// The growth strategy.
    pub fn strategy(&self) -> &ScheduleStrategy {
        &self.strategy
    }

    /// The jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Delay before recurrence `n` (0-indexed), without jitter.
    ///
    /// Returns `None` once the schedule is exhausted.
    pub fn delay_for(&self, n: u32) -> Option<Duration> {
        if self.max_recurrences.is_some_and(|max| n >= max) {
            return None;
        }

        let delay = match &self.strategy {
            ScheduleStrategy::Spaced(d) => *d,
            ScheduleStrategy::Linear { base } => base.saturating_mul(n.saturating_add(1)),
            ScheduleStrategy::Exponential { base } => base.saturating_mul(2u32.saturating_pow(n)),
            ScheduleStrategy::Fibonacci { base } => {
                base.saturating_mul(fibonacci(n.saturating_add(1)))
            }
        };

        Some(match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        })
    }

    /// Delay before recurrence `n` with jitter applied.
    pub fn jittered_delay_for(&self, n: u32) -> Option<Duration> {
        let delay = self.delay_for(n)?;
        Some(self.jitter.apply(delay, self.max_delay))
    }

    /// Iterate the jittered delays of every recurrence.
    pub fn recurrences(&self) -> impl Iterator<Item = Duration> + '_ {
        (0u32..).map_while(move |n| self.jittered_delay_for(n))
    }
}

impl JitterStrategy {
    /// Apply jitter to `delay`, never exceeding `max_delay`.
    pub fn apply(&self, delay: Duration, max_delay: Option<Duration>) -> Duration {
        let jittered = match self {
            JitterStrategy::None => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) => {
                use rand::Rng;
                let millis = delay.as_millis() as f64;
                let range = millis * factor;
                let low = (millis - range).max(0.0);
                let high = millis + range;
                Duration::from_millis(rand::rng().random_range(low..=high) as u64)
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Proportional(_) => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let millis = delay.as_millis() as u64;
                if millis == 0 {
                    Duration::ZERO
                } else {
                    Duration::from_millis(rand::rng().random_range(0..=millis))
                }
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Full => delay,
        };

        match max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}

fn fibonacci(n: u32) -> u32 {
    if n == 0 {
        return 0;
    }
    let (mut a, mut b) = (0u32, 1u32);
    for _ in 1..n {
        let next = a.saturating_add(b);
        a = b;
        b = next;
    }
    b
}

/// How many inner streams a flattening combinator may run at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Concurrency {
    /// No limit.
    #[default]
    Unbounded,
    /// At most `n` at a time.
    Bounded(NonZeroUsize),
}

impl Concurrency {
    /// A bounded setting; `0` is treated as `1`.
    pub fn bounded(n: usize) -> Self {
        Concurrency::Bounded(NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN))
    }

    /// The permit count, or `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Concurrency::Unbounded => None,
            Concurrency::Bounded(n) => Some(n.get()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaced_is_unbounded() {
        let schedule = Schedule::spaced(Duration::from_millis(5));
        assert_eq!(schedule.delay_for(u32::MAX - 1), Some(Duration::from_millis(5)));
        assert_eq!(schedule.max_recurrences(), None);
    }

    #[test]
    fn linear_grows() {
        let schedule = Schedule::linear(Duration::from_millis(100)).with_max_recurrences(3);
        let delays: Vec<_> = schedule.recurrences().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(300)
            ]
        );
    }

    #[test]
    fn fibonacci_grows() {
        let schedule = Schedule::fibonacci(Duration::from_millis(10)).with_max_recurrences(6);
        let delays: Vec<_> = schedule.recurrences().map(|d| d.as_millis()).collect();
        assert_eq!(delays, vec![10, 10, 20, 30, 50, 80]);
    }

    #[test]
    fn max_delay_caps() {
        let schedule = Schedule::exponential(Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(250));
        assert_eq!(schedule.delay_for(0), Some(Duration::from_millis(100)));
        assert_eq!(schedule.delay_for(1), Some(Duration::from_millis(200)));
        assert_eq!(schedule.delay_for(2), Some(Duration::from_millis(250)));
        assert_eq!(schedule.delay_for(30), Some(Duration::from_millis(250)));
    }

    #[test]
    fn exhausted_after_max_recurrences() {
        let schedule = Schedule::spaced(Duration::from_millis(1)).with_max_recurrences(2);
        assert!(schedule.delay_for(1).is_some());
        assert!(schedule.delay_for(2).is_none());
        assert_eq!(schedule.recurrences().count(), 2);
    }

    #[test]
    fn jitter_respects_cap() {
        let schedule = Schedule::spaced(Duration::from_millis(100))
            .with_jitter(1.0)
            .with_max_delay(Duration::from_millis(100));
        for delay in schedule.recurrences().take(20) {
            assert!(delay <= Duration::from_millis(100));
        }
    }

    #[test]
    fn fibonacci_function() {
        let seq: Vec<_> = (0..8).map(fibonacci).collect();
        assert_eq!(seq, vec![0, 1, 1, 2, 3, 5, 8, 13]);
    }

    #[test]
    fn concurrency_bounded_never_zero() {
        assert_eq!(Concurrency::bounded(0).limit(), Some(1));
        assert_eq!(Concurrency::bounded(4).limit(), Some(4));
        assert_eq!(Concurrency::Unbounded.limit(), None);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn concurrency_serde_roundtrip() {
        let json = serde_json::to_string(&Concurrency::bounded(3)).unwrap();
        assert_eq!(json, r#"{"Bounded":3}"#);
        let back: Concurrency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Concurrency::bounded(3));
    }
}
