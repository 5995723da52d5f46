//! Unified error handling for the back-office API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::AccessError;

/// Application-level error type for the back-office API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Access workflow refused or failed the operation.
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Bearer token missing, malformed or rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed path, query or body.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    const fn status(&self) -> StatusCode {
        match self {
            Self::Access(e) => match e {
                AccessError::NotAuthenticated => StatusCode::UNAUTHORIZED,
                AccessError::EmailMismatch => StatusCode::BAD_REQUEST,
                AccessError::PermissionDenied(_) => StatusCode::FORBIDDEN,
                AccessError::NotFound(_) => StatusCode::NOT_FOUND,
                AccessError::AlreadyReviewed(_)
                | AccessError::DuplicatePending
                | AccessError::AlreadyPrivileged => StatusCode::CONFLICT,
                AccessError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry and don't expose their details to clients
        let message = if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Back-office request error"
            );
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Set the Sentry user context from a resolved principal.
pub fn set_sentry_user(principal_id: &str, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(principal_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
mod tests {
    use agency_core::{AdminRequestId, PolicyViolation, Role};

    use super::*;
    use crate::db::RepositoryError;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::from(AccessError::NotFound(AdminRequestId::new(7)));
        assert_eq!(err.to_string(), "access request 7 not found");
    }

    #[test]
    fn test_access_error_status_codes() {
        assert_eq!(
            get_status(AccessError::NotAuthenticated.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AccessError::PermissionDenied(PolicyViolation::RoleNotAssignable(Role::Admin)).into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AccessError::NotFound(AdminRequestId::new(1)).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AccessError::AlreadyReviewed(AdminRequestId::new(1)).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AccessError::DuplicatePending.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AccessError::AlreadyPrivileged.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AccessError::EmailMismatch.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_persistence_errors_are_internal() {
        assert_eq!(
            get_status(AccessError::Repository(RepositoryError::NotFound).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AccessError::Repository(RepositoryError::Unavailable("down".to_string())).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Unauthorized("bad token".to_string())),
            StatusCode::UNAUTHORIZED
        );
    }
}
