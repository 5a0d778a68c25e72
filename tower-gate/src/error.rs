/// Errors produced by the Tower Gate middleware.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GateError {
    /// The request was rejected by the admission-control strategy.
    ///
    /// There is no retry-after hint: the limiters expose a boolean contract
    /// only. When the `axum` feature is enabled, this converts to
    /// `429 Too Many Requests`.
    #[error("Too many requests; admission rejected")]
    RateLimited,
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        match self {
            Self::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, self.to_string()).into_response()
            }
        }
    }
}
