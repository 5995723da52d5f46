//! HTTP route handlers for the back-office API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (store reachable)
//!
//! # Caller
//! GET  /api/me                              - Resolved profile and capabilities
//! GET  /api/roles/assignable                - Roles the caller may grant (or request)
//!
//! # Access requests
//! GET  /api/access-requests/mine            - Caller's latest request
//! POST /api/access-requests                 - File a request
//! GET  /api/access-requests?status=         - Review queue (reviewers only)
//! POST /api/access-requests/{id}/approve    - Approve with a role
//! POST /api/access-requests/{id}/reject     - Reject
//!
//! # Profiles (admins only)
//! GET  /api/profiles                        - All profiles
//! ```

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub mod access_requests;
pub mod extract;
pub mod health;
pub mod me;
pub mod profiles;

/// Build the back-office router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/api/me", get(me::show))
        .route("/api/roles/assignable", get(me::assignable))
        .route("/api/access-requests/mine", get(access_requests::mine))
        .route(
            "/api/access-requests",
            get(access_requests::index).post(access_requests::submit),
        )
        .route(
            "/api/access-requests/{id}/approve",
            post(access_requests::approve),
        )
        .route(
            "/api/access-requests/{id}/reject",
            post(access_requests::reject),
        )
        .route("/api/profiles", get(profiles::index))
}
