use std::num::NonZeroUsize;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Clock;
use quanta::Instant;

use super::Limiter;

/// An exact sliding window over a single global timestamp log.
///
/// Every call filters out the timestamps at or before `now - window` and
/// admits only while fewer than `limit` remain. No approximation error, at
/// the cost of storing up to `limit` timestamps in steady state.
#[derive(Debug)]
pub struct SlidingWindowLog {
    limit: usize,
    window_ns: u64,
    log: Mutex<Vec<u64>>,
    clock: Clock,
    anchor: Instant,
}

impl SlidingWindowLog {
    pub fn new(limit: NonZeroUsize, window: Duration) -> Self {
        Self::with_clock(limit, window, Clock::new())
    }

    pub fn with_clock(limit: NonZeroUsize, window: Duration, clock: Clock) -> Self {
        let anchor = clock.now();
        Self {
            limit: limit.get(),
            window_ns: window.as_nanos() as u64,
            log: Mutex::new(Vec::new()),
            clock,
            anchor,
        }
    }
}

impl Limiter for SlidingWindowLog {
    fn allow(&self, _key: &str) -> bool {
        let now = self.clock.now().duration_since(self.anchor).as_nanos() as u64;
        let mut log = self.log.lock();

        // Keep only the timestamps strictly inside the trailing window. The
        // trimmed log is retained whether or not the call is admitted.
        if let Some(cutoff) = now.checked_sub(self.window_ns) {
            let expired = log.partition_point(|stamp| *stamp <= cutoff);
            log.drain(..expired);
        }

        if log.len() < self.limit {
            log.push(now);
            true
        } else {
            false
        }
    }
}
