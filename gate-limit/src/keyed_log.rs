use std::num::NonZeroUsize;
use std::time::Duration;

use dashmap::DashMap;
use quanta::Clock;
use quanta::Instant;

use super::Limiter;

/// A per-key trimmed timestamp log.
///
/// Maintains, for every distinct client key, the admission timestamps that
/// fall within the trailing window. Each call drops the expired prefix for
/// that key before deciding, so at most `limit` admissions are ever recorded
/// for one key within any interval of the window length. Keys are fully
/// independent: saturating one never affects another.
///
/// Entries accumulate for as long as their keys keep arriving; call
/// [`KeyedWindowLog::purge_idle`] periodically to drop keys whose entire log
/// has aged out.
#[derive(Debug)]
pub struct KeyedWindowLog {
    limit: usize,
    window_ns: u64,
    logs: DashMap<String, Vec<u64>>,
    clock: Clock,
    anchor: Instant,
}

impl KeyedWindowLog {
    /// Creates a new `KeyedWindowLog`.
    ///
    /// # Arguments
    ///
    /// * `limit` - The maximum number of admissions per key within the window.
    /// * `window` - The trailing window length.
    pub fn new(limit: NonZeroUsize, window: Duration) -> Self {
        Self::with_clock(limit, window, Clock::new())
    }

    /// Creates a `KeyedWindowLog` driven by the supplied clock.
    pub fn with_clock(limit: NonZeroUsize, window: Duration, clock: Clock) -> Self {
        let anchor = clock.now();
        Self {
            limit: limit.get(),
            window_ns: window.as_nanos() as u64,
            logs: DashMap::new(),
            clock,
            anchor,
        }
    }

    /// Removes every key whose newest admission has aged out of the window.
    ///
    /// Admission semantics are unaffected: an absent entry and a fully
    /// expired one admit identically. This only bounds memory growth for
    /// workloads with high key churn.
    pub fn purge_idle(&self) {
        let now = self.now_ns();
        if let Some(cutoff) = now.checked_sub(self.window_ns) {
            self.logs
                .retain(|_, log| log.last().is_some_and(|newest| *newest >= cutoff));
        }
    }

    fn now_ns(&self) -> u64 {
        self.clock.now().duration_since(self.anchor).as_nanos() as u64
    }

    #[cfg(test)]
    pub(crate) fn tracked_keys(&self) -> usize {
        self.logs.len()
    }
}

impl Limiter for KeyedWindowLog {
    fn allow(&self, key: &str) -> bool {
        let now = self.now_ns();

        let mut log = self.logs.entry(key.to_owned()).or_default();

        // Timestamps are appended in order, so the expired entries form a
        // prefix.
        if let Some(cutoff) = now.checked_sub(self.window_ns) {
            let expired = log.partition_point(|stamp| *stamp < cutoff);
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
