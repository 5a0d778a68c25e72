use std::fmt;
use std::sync::Arc;

use gate_limit::Limiter;
use tower::Layer;

use crate::service::KeyFn;
use crate::service::RateLimitService;

/// Applies admission control to requests.
pub struct RateLimitLayer<L, Req>
where
    L: ?Sized,
{
    limiter: Arc<L>,
    key_fn: Option<KeyFn<Req>>,
}

impl<L, Req> Clone for RateLimitLayer<L, Req>
where
    L: ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<L, Req> RateLimitLayer<L, Req>
where
    L: Limiter + ?Sized,
{
    /// Create a RateLimitLayer.
    pub fn new(limiter: Arc<L>) -> Self {
        RateLimitLayer {
            limiter,
            key_fn: None,
        }
    }

    /// Install a key extractor for per-key limiters.
    ///
    /// The extracted string (e.g. a client address) partitions limiter
    /// state. Single-tenant limiters ignore it, so an extractor is only
    /// worth installing in front of keyed strategies.
    pub fn with_key_fn<F>(mut self, extract: F) -> Self
    where
        F: Fn(&Req) -> String + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(extract));
        self
    }
}

impl<L, S, Req> Layer<S> for RateLimitLayer<L, Req>
where
    L: ?Sized,
{
    type Service = RateLimitService<L, S, Req>;

    fn layer(&self, service: S) -> Self::Service {
        let mut svc = RateLimitService::new(service, self.limiter.clone());
        if let Some(key_fn) = &self.key_fn {
            svc = svc.with_key_fn_arc(Arc::clone(key_fn));
        }
        svc
    }
}

impl<L, Req> fmt::Debug for RateLimitLayer<L, Req>
where
    L: fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitLayer")
            .field("limiter", &self.limiter)
            .field("keyed", &self.key_fn.is_some())
            .finish()
    }
}
