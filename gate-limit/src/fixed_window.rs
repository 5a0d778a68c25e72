use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Clock;
use quanta::Instant;

use super::Limiter;

/// A window-indexed counter limiter.
///
/// Divides time into consecutive fixed-length windows indexed from the
/// instant of construction and counts admissions per window index. It is the
/// simplest strategy but is susceptible to "boundary bursts" where double the
/// threshold is admitted in a short period spanning two windows. That
/// weakness is inherent to the algorithm and is preserved here.
#[derive(Debug)]
pub struct FixedWindowCounter {
    threshold: usize,
    window_ns: u64,
    counters: Mutex<HashMap<u64, usize>>,
    clock: Clock,
    anchor: Instant,
}

impl FixedWindowCounter {
    /// Creates a new `FixedWindowCounter`.
    ///
    /// # Arguments
    ///
    /// * `threshold` - The maximum number of admissions within a single window.
    /// * `window` - The duration of the fixed time window.
    pub fn new(threshold: NonZeroUsize, window: Duration) -> Self {
        Self::with_clock(threshold, window, Clock::new())
    }

    /// Creates a `FixedWindowCounter` driven by the supplied clock.
    pub fn with_clock(threshold: NonZeroUsize, window: Duration, clock: Clock) -> Self {
        let anchor = clock.now();
        Self {
            threshold: threshold.get(),
            window_ns: window.as_nanos() as u64,
            counters: Mutex::new(HashMap::new()),
            clock,
            anchor,
        }
    }

    #[cfg(test)]
    pub(crate) fn live_windows(&self) -> usize {
        self.counters.lock().len()
    }
}

impl Limiter for FixedWindowCounter {
    fn allow(&self, _key: &str) -> bool {
        let now = self.clock.now().duration_since(self.anchor).as_nanos() as u64;
        let current_window = now / self.window_ns;

        let mut counters = self.counters.lock();

        // Evict every stale index, not just the immediately preceding one;
        // the limiter may have been idle for an arbitrary number of windows.
        counters.retain(|window, _| *window >= current_window);

        let count = counters.entry(current_window).or_insert(0);
        if *count < self.threshold {
            *count += 1;
            true
        } else {
            false
        }
    }
}
