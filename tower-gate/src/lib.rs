//! # Tower Gate
//!
//! `tower-gate` is the request-interception side of the `gate-limit` stack:
//! a [Tower](https://github.com/tower-rs/tower) middleware that consults a
//! [`gate_limit::Limiter`] before every request.
//!
//! ## Shed-First
//!
//! The admission contract is a plain boolean, so there is nothing to wait
//! for: when a limiter answers `false`, the service immediately fails the
//! request with [`GateError::RateLimited`] and never constructs the inner
//! future. The protected handler only ever sees admitted traffic.
//!
//! ## Keyed limiting
//!
//! [`RateLimitLayer::with_key_fn`] installs a key extractor so that per-key
//! limiters (such as [`gate_limit::KeyedWindowLog`]) can partition state by
//! client identity, e.g. a source address. Without an extractor every
//! request shares the empty key, which is what the single-tenant limiters
//! expect.
//!
//! ## Feature Flags
//!
//! - `axum`: Enables `IntoResponse` for [`GateError`], mapping a rejection
//!   to `429 Too Many Requests`.

mod error;
mod layer;
mod service;

#[cfg(test)]
mod tests;

pub use error::GateError;
pub use layer::RateLimitLayer;
pub use service::RateLimitService;
