//! Access request repository.
//!
//! A request leaves `pending` exactly once. Every status change is guarded by
//! `status = 'pending'` in the `WHERE` clause, so a terminal row is never touched.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgExecutor;

use agency_core::{
    AdminRequest, AdminRequestId, Email, NewAdminRequest, PrincipalId, RequestStatus, Role,
};

use super::{RepositoryError, conflict_on_unique};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AdminRequestRow {
    id: AdminRequestId,
    user_id: PrincipalId,
    email: String,
    full_name: Option<String>,
    message: Option<String>,
    requested_role: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    reviewed_at: Option<DateTime<Utc>>,
    reviewed_by: Option<PrincipalId>,
}

impl TryFrom<AdminRequestRow> for AdminRequest {
    type Error = RepositoryError;

    fn try_from(row: AdminRequestRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let requested_role = row
            .requested_role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let status = row
            .status
            .parse::<RequestStatus>()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            email,
            full_name: row.full_name,
            message: row.message,
            requested_role,
            status,
            created_at: row.created_at,
            reviewed_at: row.reviewed_at,
            reviewed_by: row.reviewed_by,
        })
    }
}

// =============================================================================
// Transaction steps
// =============================================================================

/// Lock a request row for review.
///
/// Returns `NotFound` if the row does not exist and `Conflict` if it has already
/// been reviewed.
pub(crate) async fn lock_pending<'e, E>(
    executor: E,
    id: AdminRequestId,
) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    let status: Option<String> = sqlx::query_scalar(
        r"
        SELECT status
        FROM backoffice.admin_request
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(executor)
    .await?;

    match status.as_deref() {
        None => Err(RepositoryError::NotFound),
        Some("pending") => Ok(()),
        Some(other) => Err(RepositoryError::Conflict(format!(
            "request {id} is already {other}"
        ))),
    }
}

/// Move a pending request to `status`, stamping the reviewer and review time.
///
/// Returns `Conflict` if the request is no longer pending.
pub(crate) async fn mark_reviewed<'e, E>(
    executor: E,
    id: AdminRequestId,
    status: RequestStatus,
    reviewer: PrincipalId,
) -> Result<AdminRequest, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdminRequestRow>(
        r"
        UPDATE backoffice.admin_request
        SET status = $2, reviewed_at = NOW(), reviewed_by = $3
        WHERE id = $1 AND status = 'pending'
        RETURNING id, user_id, email, full_name, message, requested_role, status,
                  created_at, reviewed_at, reviewed_by
        ",
    )
    .bind(id)
    .bind(status.as_str())
    .bind(reviewer)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| RepositoryError::Conflict(format!("request {id} is no longer pending")))?;

    row.try_into()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for access request database operations.
pub struct AdminRequestRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AdminRequestRepository<'a> {
    /// Create a new repository with the given database pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// File a new pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has a pending request.
    pub async fn create(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            INSERT INTO backoffice.admin_request (user_id, email, full_name, message, requested_role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, email, full_name, message, requested_role, status,
                      created_at, reviewed_at, reviewed_by
            ",
        )
        .bind(new.user_id)
        .bind(new.email.as_str())
        .bind(new.full_name.as_deref())
        .bind(new.message.as_deref())
        .bind(new.requested_role.map(Role::as_str))
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a pending request already exists for this user"))?;

        row.try_into()
    }

    /// Get a request by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(
        &self,
        id: AdminRequestId,
    ) -> Result<Option<AdminRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, email, full_name, message, requested_role, status,
                   created_at, reviewed_at, reviewed_by
            FROM backoffice.admin_request
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get the most recently filed request of a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_for_user(
        &self,
        user_id: PrincipalId,
    ) -> Result<Option<AdminRequest>, RepositoryError> {
        let row = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, email, full_name, message, requested_role, status,
                   created_at, reviewed_at, reviewed_by
            FROM backoffice.admin_request
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List requests, optionally filtered by status, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, AdminRequestRow>(
            r"
            SELECT id, user_id, email, full_name, message, requested_role, status,
                   created_at, reviewed_at, reviewed_by
            FROM backoffice.admin_request
            WHERE ($1::text IS NULL OR status = $1)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(status.map(RequestStatus::as_str))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
