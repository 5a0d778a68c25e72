use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Context;
use std::task::Poll;

use opentelemetry::global;
use opentelemetry::metrics::Counter;
use pin_project_lite::pin_project;
use tower::BoxError;
use tower::Service;
use tracing::debug;

use gate_limit::Limiter;

use crate::error::GateError;

/// Extracts the client key from a request.
pub(crate) type KeyFn<Req> = Arc<dyn Fn(&Req) -> String + Send + Sync>;

#[derive(Clone, Debug)]
struct RateLimitServiceMetrics {
    rejected: Counter<u64>,
}

/// A service that consults a [`Limiter`] before forwarding each request.
///
/// Rejections fail fast with [`GateError::RateLimited`]; the inner future is
/// never constructed for a rejected request.
pub struct RateLimitService<L, S, Req>
where
    L: ?Sized,
{
    inner: S,
    limiter: Arc<L>,
    key_fn: Option<KeyFn<Req>>,
    instruments: RateLimitServiceMetrics,
}

pin_project! {
    /// The response future: either the inner service's future, or an
    /// immediate rejection.
    #[project = ResponseFutureProj]
    pub enum ResponseFuture<F> {
        Forwarded { #[pin] inner: F },
        Rejected,
    }
}

impl<F, T> Future for ResponseFuture<F>
where
    F: Future<Output = Result<T, BoxError>>,
{
    type Output = Result<T, BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            ResponseFutureProj::Forwarded { inner } => inner.poll(cx),
            ResponseFutureProj::Rejected => {
                Poll::Ready(Err(BoxError::from(GateError::RateLimited)))
            }
        }
    }
}

// Manually implement Clone so that S: Clone is the only requirement
impl<L, S, Req> Clone for RateLimitService<L, S, Req>
where
    L: ?Sized,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
            key_fn: self.key_fn.clone(),
            instruments: self.instruments.clone(),
        }
    }
}

impl<L, S, Req> Service<Req> for RateLimitService<L, S, Req>
where
    L: Limiter + ?Sized + Send + Sync + 'static,
    S: Service<Req, Error = BoxError>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Admission is decided per-request in `call`; readiness is the
        // inner service's alone.
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let key = match &self.key_fn {
            Some(extract) => extract(&req),
            None => String::new(),
        };

        if self.limiter.allow(&key) {
            ResponseFuture::Forwarded {
                inner: self.inner.call(req),
            }
        } else {
            debug!(key = %key, "admission rejected");
            self.instruments.rejected.add(1, &[]);
            ResponseFuture::Rejected
        }
    }
}

impl<L, S, Req> RateLimitService<L, S, Req>
where
    L: ?Sized,
{
    pub fn new(inner: S, limiter: Arc<L>) -> Self {
        let meter = global::meter("gate_limit_service");
        let instruments = RateLimitServiceMetrics {
            rejected: meter.u64_counter("gate_limit_rejected").build(),
        };

        Self {
            inner,
            limiter,
            key_fn: None,
            instruments,
        }
    }

    /// Install a key extractor for per-key limiters.
    pub fn with_key_fn<F>(self, extract: F) -> Self
    where
        F: Fn(&Req) -> String + Send + Sync + 'static,
    {
        self.with_key_fn_arc(Arc::new(extract))
    }

    pub(crate) fn with_key_fn_arc(mut self, extract: KeyFn<Req>) -> Self {
        self.key_fn = Some(extract);
        self
    }
}

impl<L, S, Req> fmt::Debug for RateLimitService<L, S, Req>
where
    L: fmt::Debug + ?Sized,
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitService")
            .field("inner", &self.inner)
            .field("limiter", &self.limiter)
            .field("keyed", &self.key_fn.is_some())
            .finish_non_exhaustive()
    }
}
