//! Data access for the back-office.
//!
//! # Tables (`backoffice` schema)
//!
//! - `profile` - Role and approval state, one row per principal
//! - `admin_request` - Access requests and their review outcome
//!
//! # Migrations
//!
//! Migrations are stored in `crates/backoffice/migrations/` and run via:
//! ```bash
//! cargo run -p agency-cli -- migrate
//! ```
//!
//! Row-level security on the hosted database may restrict the same rows again.
//! Nothing here relies on it; permission checks happen in the services before a
//! write is issued.

pub mod admin_requests;
pub mod memory;
pub mod profiles;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use agency_core::{
    AdminRequest, AdminRequestId, Email, NewAdminRequest, PrincipalId, Profile, ProfileUpsert,
    RequestStatus,
};

pub use admin_requests::AdminRequestRepository;
pub use memory::MemoryStore;
pub use profiles::ProfileRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint or state-guard violation (e.g., duplicate pending request).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The backing store could not serve the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Map a unique violation to `Conflict`, everything else to `Database`.
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Storage boundary for profiles and access requests.
///
/// Implementations must make [`AccessStore::approve_request`] atomic and must
/// refuse to move a request out of a terminal state.
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Check that the store can serve requests.
    async fn health_check(&self) -> Result<(), RepositoryError>;

    /// Get a profile by principal ID.
    async fn profile_by_id(&self, id: PrincipalId) -> Result<Option<Profile>, RepositoryError>;

    /// Get a profile by email address.
    async fn profile_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError>;

    /// List all profiles, newest first.
    async fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError>;

    /// Insert or overwrite the profile keyed by `upsert.id`.
    ///
    /// Returns `Conflict` if the email belongs to a different profile.
    async fn upsert_profile(&self, upsert: &ProfileUpsert) -> Result<Profile, RepositoryError>;

    /// File a new pending request.
    ///
    /// Returns `Conflict` if the user already has a pending request.
    async fn create_request(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError>;

    /// Get a request by ID.
    async fn request_by_id(
        &self,
        id: AdminRequestId,
    ) -> Result<Option<AdminRequest>, RepositoryError>;

    /// Get the most recently filed request of a user.
    async fn latest_request_for_user(
        &self,
        user_id: PrincipalId,
    ) -> Result<Option<AdminRequest>, RepositoryError>;

    /// List requests, optionally filtered by status, newest first.
    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminRequest>, RepositoryError>;

    /// Approve a pending request and write the granted profile as one unit.
    ///
    /// Returns `NotFound` for an unknown request and `Conflict` if it is no longer
    /// pending. On any error neither row changes.
    async fn approve_request(
        &self,
        id: AdminRequestId,
        reviewer: PrincipalId,
        grant: &ProfileUpsert,
    ) -> Result<(AdminRequest, Profile), RepositoryError>;

    /// Reject a pending request. Profiles are not touched.
    ///
    /// Returns `NotFound` for an unknown request and `Conflict` if it is no longer pending.
    async fn reject_request(
        &self,
        id: AdminRequestId,
        reviewer: PrincipalId,
    ) -> Result<AdminRequest, RepositoryError>;
}

/// `PostgreSQL` implementation of [`AccessStore`].
#[derive(Debug, Clone)]
pub struct PgAccessStore {
    pool: PgPool,
}

impl PgAccessStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessStore for PgAccessStore {
    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn profile_by_id(&self, id: PrincipalId) -> Result<Option<Profile>, RepositoryError> {
        ProfileRepository::new(&self.pool).get_by_id(id).await
    }

    async fn profile_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        ProfileRepository::new(&self.pool).get_by_email(email).await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, RepositoryError> {
        ProfileRepository::new(&self.pool).list_all().await
    }

    async fn upsert_profile(&self, upsert: &ProfileUpsert) -> Result<Profile, RepositoryError> {
        profiles::upsert(&self.pool, upsert).await
    }

    async fn create_request(&self, new: &NewAdminRequest) -> Result<AdminRequest, RepositoryError> {
        AdminRequestRepository::new(&self.pool).create(new).await
    }

    async fn request_by_id(
        &self,
        id: AdminRequestId,
    ) -> Result<Option<AdminRequest>, RepositoryError> {
        AdminRequestRepository::new(&self.pool).get_by_id(id).await
    }

    async fn latest_request_for_user(
        &self,
        user_id: PrincipalId,
    ) -> Result<Option<AdminRequest>, RepositoryError> {
        AdminRequestRepository::new(&self.pool)
            .latest_for_user(user_id)
            .await
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminRequest>, RepositoryError> {
        AdminRequestRepository::new(&self.pool).list(status).await
    }

    async fn approve_request(
        &self,
        id: AdminRequestId,
        reviewer: PrincipalId,
        grant: &ProfileUpsert,
    ) -> Result<(AdminRequest, Profile), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        admin_requests::lock_pending(&mut *tx, id).await?;
        let request =
            admin_requests::mark_reviewed(&mut *tx, id, RequestStatus::Approved, reviewer).await?;
        let profile = profiles::upsert(&mut *tx, grant).await?;

        // Dropping `tx` on any error above rolls both writes back.
        tx.commit().await?;

        Ok((request, profile))
    }

    async fn reject_request(
        &self,
        id: AdminRequestId,
        reviewer: PrincipalId,
    ) -> Result<AdminRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        admin_requests::lock_pending(&mut *tx, id).await?;
        let request =
            admin_requests::mark_reviewed(&mut *tx, id, RequestStatus::Rejected, reviewer).await?;

        tx.commit().await?;

        Ok(request)
    }
}
