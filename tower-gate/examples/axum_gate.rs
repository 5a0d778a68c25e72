use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use gate_limit::KeyedWindowLog;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower::BoxError;
use tower::ServiceBuilder;
use tower_gate::{GateError, RateLimitLayer};

#[tokio::main]
async fn main() {
    // 1. Per-client strategy: 10 requests per minute per source address
    let limit = 10.try_into().unwrap();
    let strategy = Arc::new(KeyedWindowLog::new(limit, Duration::from_secs(60)));

    // 2. Key each request by its peer address
    let layer = RateLimitLayer::<_, Request>::new(strategy).with_key_fn(|req: &Request| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.ip().to_string())
            .unwrap_or_default()
    });

    // 3. Build the Router
    let app = Router::new()
        .route("/", get(|| async { "Hello, Gate!" }))
        .layer(
            ServiceBuilder::new()
                // The outermost layer: catches BoxError and returns Response
                .layer(HandleErrorLayer::new(handle_gate_error))
                .layer(layer)
                // Converts the Route's Infallible to BoxError so that
                // RateLimitLayer is happy wrapping it.
                .map_err(BoxError::from),
        );

    // 4. Serve
    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .unwrap();
    println!("listening on http://127.0.0.1:3000");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

/// The signature must match BoxError -> IntoResponse
async fn handle_gate_error(err: tower::BoxError) -> impl IntoResponse {
    if let Some(gate_err) = err.downcast_ref::<GateError>() {
        gate_err.clone().into_response()
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Service Error").into_response()
    }
}
