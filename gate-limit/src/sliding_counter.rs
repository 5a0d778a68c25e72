use std::num::NonZeroUsize;
use std::time::Duration;

use parking_lot::Mutex;
use quanta::Clock;
use quanta::Instant;

use super::Limiter;

/// A two-window sliding counter.
///
/// Approximates a true sliding window with two adjacent fixed windows and a
/// linear interpolation weight: the effective count is
/// `current + previous * (1 - elapsed_fraction)`. This trades the exactness
/// of a timestamp log for O(1) memory.
#[derive(Debug)]
pub struct SlidingWindowCounter {
    limit: usize,
    window_ns: u64,
    state: Mutex<TwoWindowState>,
    clock: Clock,
    anchor: Instant,
}

#[derive(Debug)]
struct TwoWindowState {
    /// Nanos from the anchor at which the current window began.
    window_start: u64,
    previous: usize,
    current: usize,
}

impl SlidingWindowCounter {
    pub fn new(limit: NonZeroUsize, window: Duration) -> Self {
        Self::with_clock(limit, window, Clock::new())
    }

    pub fn with_clock(limit: NonZeroUsize, window: Duration, clock: Clock) -> Self {
        let anchor = clock.now();
        Self {
            limit: limit.get(),
            window_ns: window.as_nanos() as u64,
            state: Mutex::new(TwoWindowState {
                window_start: 0,
                previous: 0,
                current: 0,
            }),
            clock,
            anchor,
        }
    }
}

impl Limiter for SlidingWindowCounter {
    fn allow(&self, _key: &str) -> bool {
        let now = self.clock.now().duration_since(self.anchor).as_nanos() as u64;
        let mut state = self.state.lock();

        // 1. Window Rotation. The previous count is whatever the current
        // window held, even after a long idle gap.
        let mut elapsed = now.saturating_sub(state.window_start);
        if elapsed >= self.window_ns {
            state.previous = state.current;
            state.current = 0;
            state.window_start = now;
            elapsed = 0;
        }

        // 2. Weighted estimate. The estimate is floored, not rounded,
        // before the comparison.
        let fraction = elapsed as f64 / self.window_ns as f64;
        let estimate = state.current as f64 + state.previous as f64 * (1.0 - fraction);

        // 3. Enforcement
        if estimate.floor() < self.limit as f64 {
            state.current += 1;
            true
        } else {
            false
        }
    }
}
