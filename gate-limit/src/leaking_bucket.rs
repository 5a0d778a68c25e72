use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use super::Limiter;

/// A leaking bucket limiter.
///
/// The bucket level grows by one on every admission and a background task
/// drains it by `leak_rate` every `leak_period`, floored at zero. The bucket
/// starts empty, so bursts are limited from the very first request - the
/// opposite of [`TokenBucket`](crate::TokenBucket), which starts full.
///
/// Constructing a `LeakingBucket` spawns the leak task onto the ambient
/// tokio runtime, so `new` must be called from within one. The task runs
/// until [`LeakingBucket::shutdown`] is called or the bucket is dropped.
#[derive(Debug)]
pub struct LeakingBucket {
    shared: Arc<Shared>,
    drain: JoinHandle<()>,
}

#[derive(Debug)]
struct Shared {
    capacity: usize,
    level: Mutex<usize>,
}

impl LeakingBucket {
    /// Creates a new `LeakingBucket` and starts its leak task.
    ///
    /// # Arguments
    ///
    /// * `capacity` - The maximum queue depth.
    /// * `leak_rate` - How much the level drops per period.
    /// * `leak_period` - The fixed interval between leaks.
    pub fn new(capacity: NonZeroUsize, leak_rate: usize, leak_period: Duration) -> Self {
        let shared = Arc::new(Shared {
            capacity: capacity.get(),
            level: Mutex::new(0),
        });

        let worker = Arc::clone(&shared);
        // The first leak fires one full period after creation; the deadline
        // is anchored here, not at the task's first poll.
        let first_leak = time::Instant::now() + leak_period;
        let drain = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_leak, leak_period);
            loop {
                ticker.tick().await;
                {
                    let mut level = worker.level.lock();
                    *level = level.saturating_sub(leak_rate);
                }
            }
        });

        Self { shared, drain }
    }

    /// Attempts to enqueue a single request.
    ///
    /// Returns `false` when the bucket is at capacity.
    pub fn add_request(&self) -> bool {
        let mut level = self.shared.level.lock();
        if *level < self.shared.capacity {
            *level += 1;
            true
        } else {
            false
        }
    }

    /// The current queue depth.
    pub fn level(&self) -> usize {
        *self.shared.level.lock()
    }

    /// The maximum queue depth.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Stops the background leak task.
    ///
    /// The bucket keeps answering admission calls afterwards, but its level
    /// no longer decays.
    pub fn shutdown(&self) {
        self.drain.abort();
    }
}

impl Drop for LeakingBucket {
    fn drop(&mut self) {
        self.drain.abort();
    }
}

impl Limiter for LeakingBucket {
    fn allow(&self, _key: &str) -> bool {
        self.add_request()
    }
}
