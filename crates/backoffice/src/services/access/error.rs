//! Access workflow error types.

use thiserror::Error;

use agency_core::{AdminRequestId, PolicyViolation};

use crate::db::RepositoryError;

/// Errors that can occur during access workflow operations.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No authenticated principal.
    #[error("authentication required")]
    NotAuthenticated,

    /// The caller's capabilities do not allow the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(#[from] PolicyViolation),

    /// Access request not found.
    #[error("access request {0} not found")]
    NotFound(AdminRequestId),

    /// The request has already left `pending`.
    #[error("access request {0} has already been reviewed")]
    AlreadyReviewed(AdminRequestId),

    /// The caller already has a request awaiting review.
    #[error("you already have a pending access request")]
    DuplicatePending,

    /// The caller already holds a role and has nothing to request.
    #[error("you already have back-office access")]
    AlreadyPrivileged,

    /// The submitted email is not the caller's authenticated address.
    #[error("the request email must be your own address")]
    EmailMismatch,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
