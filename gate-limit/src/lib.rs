//! # gate-limit
//!
//! `gate-limit` is an admission-control library: given a stream of incoming
//! requests, each limiter decides in real time whether a request is admitted
//! or rejected, so a protected downstream resource never receives more than a
//! configured rate of work.
//!
//! ## Core Philosophy
//!
//! Every limiter is a small, self-contained state machine behind one lock.
//! Each admission is a single acquire → read-modify-write → release critical
//! section, so a burst of N concurrent callers against a threshold of T
//! observes exactly T admissions, never more. The bucket limiters own a
//! background tokio task that decays or refills their level on a fixed
//! period, independent of admission traffic.
//!
//! ## Key Concepts
//!
//! * **Limiter Trait**: a unified `allow(key) -> bool` interface for all
//!   algorithms. Single-tenant limiters ignore the key.
//! * **Boolean Contract**: rejection is a normal outcome, not an error.
//!   There is no retry-after hint and no remaining-quota value.
//! * **Keyed State**: [`KeyedWindowLog`] keeps one independent trimmed
//!   timestamp log per client key; saturating one key never affects another.
//!
//! ## Example
//!
//! ```rust
//! use gate_limit::Limiter;
//! use gate_limit::SlidingWindowCounter;
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! let limit = NonZeroUsize::new(100).unwrap();
//! let limiter = SlidingWindowCounter::new(limit, Duration::from_secs(60));
//!
//! if limiter.allow("203.0.113.7") {
//!     // Request admitted
//! }
//! ```

use std::fmt::Debug;

mod fixed_window;
mod keyed_log;
mod leaking_bucket;
mod sliding_counter;
mod sliding_log;
mod token_bucket;

pub use fixed_window::FixedWindowCounter;
pub use keyed_log::KeyedWindowLog;
pub use leaking_bucket::LeakingBucket;
pub use sliding_counter::SlidingWindowCounter;
pub use sliding_log::SlidingWindowLog;
pub use token_bucket::TokenBucket;

/// The core trait for all admission-control algorithms.
///
/// Limiters must be `Send` and `Sync` to allow sharing across thread
/// boundaries via `Arc`.
pub trait Limiter: Debug {
    /// Attempts to admit a single request.
    ///
    /// `key` is an opaque client identifier (for example a source address).
    /// The single-tenant algorithms maintain one global state and ignore it;
    /// [`KeyedWindowLog`] maintains one independent state per distinct key.
    ///
    /// Returns `false` when the configured rate has been reached. Rejection
    /// is a normal outcome of the admission protocol, not an error.
    fn allow(&self, key: &str) -> bool;
}
