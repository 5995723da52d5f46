//! Access request domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdminRequestId, Email, PrincipalId, RequestStatus, Role};

/// A principal's request to be granted a back-office role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRequest {
    /// Unique request ID.
    pub id: AdminRequestId,
    /// Principal who filed the request.
    pub user_id: PrincipalId,
    /// Contact email given with the request.
    pub email: Email,
    /// Display name given with the request.
    pub full_name: Option<String>,
    /// Free-text justification.
    pub message: Option<String>,
    /// Role the requester asked for. The reviewer decides the granted role.
    pub requested_role: Option<Role>,
    /// Lifecycle state.
    pub status: RequestStatus,
    /// When the request was filed.
    pub created_at: DateTime<Utc>,
    /// When the request left `pending`.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer who approved or rejected the request.
    pub reviewed_by: Option<PrincipalId>,
}

impl AdminRequest {
    /// Returns true while the request awaits review.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }
}

/// Parameters for filing a new access request.
#[derive(Debug, Clone)]
pub struct NewAdminRequest {
    pub user_id: PrincipalId,
    pub email: Email,
    pub full_name: Option<String>,
    pub message: Option<String>,
    pub requested_role: Option<Role>,
}
