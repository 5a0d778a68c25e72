use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use super::Limiter;

/// A token bucket limiter. Starts full, so an initial burst up to capacity
/// is admitted before the refill rate takes over.
///
/// `new` spawns the refill task onto the ambient tokio runtime and must be
/// called from within one.
#[derive(Debug)]
pub struct TokenBucket {
    shared: Arc<Shared>,
    refill: JoinHandle<()>,
}

#[derive(Debug)]
struct Shared {
    capacity: usize,
    tokens: Mutex<usize>,
}

impl TokenBucket {
    pub fn new(capacity: NonZeroUsize, refill_rate: usize, refill_period: Duration) -> Self {
        let shared = Arc::new(Shared {
            capacity: capacity.get(),
            tokens: Mutex::new(capacity.get()),
        });

        let worker = Arc::clone(&shared);
        let first_refill = time::Instant::now() + refill_period;
        let refill = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_refill, refill_period);
            loop {
                ticker.tick().await;
                {
                    let mut tokens = worker.tokens.lock();
                    *tokens = (*tokens + refill_rate).min(worker.capacity);
                }
            }
        });

        Self { shared, refill }
    }

    /// The number of tokens currently available.
    pub fn tokens(&self) -> usize {
        *self.shared.tokens.lock()
    }

    /// The maximum number of tokens the bucket can hold.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Stops the background refill task.
    pub fn shutdown(&self) {
        self.refill.abort();
    }
}

impl Drop for TokenBucket {
    fn drop(&mut self) {
        self.refill.abort();
    }
}

impl Limiter for TokenBucket {
    fn allow(&self, _key: &str) -> bool {
        let mut tokens = self.shared.tokens.lock();
        if *tokens > 0 {
            *tokens -= 1;
            true
        } else {
            false
        }
    }
}
