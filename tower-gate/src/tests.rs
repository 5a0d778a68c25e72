use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use gate_limit::FixedWindowCounter;
use gate_limit::KeyedWindowLog;
use gate_limit::TokenBucket;
use tower::BoxError;
use tower::Layer;
use tower::Service;
use tower::ServiceExt;

use super::*;

use futures::future::Ready;
use futures::future::ready;

#[derive(Clone, Debug)]
struct MockService {
    pub count: Arc<AtomicUsize>,
}

impl Service<()> for MockService {
    type Response = ();
    type Error = BoxError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ()) -> Self::Future {
        self.count.fetch_add(1, Ordering::SeqCst);
        ready(Ok(()))
    }
}

// A handler that echoes the request key back, for the keyed tests.
#[derive(Clone, Debug)]
struct EchoService {
    pub count: Arc<AtomicUsize>,
}

impl Service<String> for EchoService {
    type Response = String;
    type Error = BoxError;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: String) -> Self::Future {
        self.count.fetch_add(1, Ordering::SeqCst);
        ready(Ok(req))
    }
}

#[tokio::test]
async fn test_layer_integration() {
    let limiter = TokenBucket::new(NonZeroUsize::new(100).unwrap(), 1, Duration::from_secs(1));

    let mut service = tower::ServiceBuilder::new()
        .layer(RateLimitLayer::new(Arc::new(limiter)))
        .service(MockService {
            count: Arc::new(AtomicUsize::new(0)),
        });

    // Verify it handles a basic request
    service.ready().await.unwrap().call(()).await.unwrap();
}

#[tokio::test]
async fn test_rejection_is_gate_error() {
    let limiter = FixedWindowCounter::new(NonZeroUsize::new(1).unwrap(), Duration::from_secs(60));
    let count = Arc::new(AtomicUsize::new(0));

    let mut service = RateLimitService::new(
        MockService {
            count: count.clone(),
        },
        Arc::new(limiter),
    );

    service.ready().await.unwrap().call(()).await.unwrap();

    let err = service
        .ready()
        .await
        .unwrap()
        .call(())
        .await
        .expect_err("second request must be rejected");
    assert!(err.is::<GateError>());
    assert!(matches!(
        err.downcast_ref::<GateError>(),
        Some(GateError::RateLimited)
    ));

    // The rejected request never reached the protected handler.
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_shared_state_across_clones() {
    let rl = FixedWindowCounter::new(NonZeroUsize::new(1).unwrap(), Duration::from_secs(10));
    let layer = RateLimitLayer::new(Arc::new(rl));

    let mut svc1 = layer.layer(MockService {
        count: Arc::new(AtomicUsize::new(0)),
    });
    let mut svc2 = layer.layer(MockService {
        count: Arc::new(AtomicUsize::new(0)),
    });

    svc1.ready().await.unwrap().call(()).await.unwrap();

    // svc2 shares the limiter state, so svc1's admission used the window up.
    let err = svc2.ready().await.unwrap().call(()).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_keyed_extraction_partitions_state() {
    let limiter = KeyedWindowLog::new(NonZeroUsize::new(1).unwrap(), Duration::from_secs(60));
    let count = Arc::new(AtomicUsize::new(0));

    let layer = RateLimitLayer::new(Arc::new(limiter)).with_key_fn(|req: &String| req.clone());
    let mut service = layer.layer(EchoService {
        count: count.clone(),
    });

    let echoed = service
        .ready()
        .await
        .unwrap()
        .call("10.0.0.1".to_owned())
        .await
        .unwrap();
    assert_eq!(echoed, "10.0.0.1");

    // Same key: rejected. Different key: fresh state.
    assert!(
        service
            .ready()
            .await
            .unwrap()
            .call("10.0.0.1".to_owned())
            .await
            .is_err()
    );
    assert!(
        service
            .ready()
            .await
            .unwrap()
            .call("10.0.0.2".to_owned())
            .await
            .is_ok()
    );

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_hammer() {
    let capacity = 50;
    let strategy = Arc::new(FixedWindowCounter::new(
        NonZeroUsize::new(capacity).unwrap(),
        Duration::from_secs(60),
    ));

    let mock_count = Arc::new(AtomicUsize::new(0));
    let service = RateLimitService::new(
        MockService {
            count: mock_count.clone(),
        },
        strategy,
    );

    let mut handles = vec![];
    for _ in 0..capacity * 2 {
        let mut svc = service.clone();
        handles.push(tokio::spawn(async move {
            svc.ready().await.expect("service should stay healthy");
            svc.call(()).await
        }));
    }

    let results = futures::future::join_all(handles).await;
    let success_count = results
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(()))))
        .count();

    // Exactly 'capacity' requests pass, and the inner service only ever
    // sees those.
    assert_eq!(success_count, capacity);
    assert_eq!(mock_count.load(Ordering::SeqCst), capacity);
}
