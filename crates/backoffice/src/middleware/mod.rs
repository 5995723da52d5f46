//! HTTP middleware and extractors for the back-office.
//!
//! # Request flow
//!
//! 1. Sentry layers (outermost, set up in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. [`CurrentAccess`] extractor: bearer token to principal to [`AccessContext`](crate::models::AccessContext)

pub mod auth;

pub use auth::{Claims, CurrentAccess, TokenError, TokenVerifier, UserMetadata};
