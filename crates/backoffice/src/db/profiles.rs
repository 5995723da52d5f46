//! Profile repository.
//!
//! Queries are built at runtime so the crate compiles without a live database.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgExecutor;

use agency_core::{AdminLevel, Email, PrincipalId, Profile, ProfileUpsert, Role};

use super::{RepositoryError, conflict_on_unique};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    id: PrincipalId,
    email: String,
    full_name: Option<String>,
    role: Option<String>,
    admin_level: Option<String>,
    approved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        let role = row
            .role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let admin_level = row
            .admin_level
            .as_deref()
            .map(str::parse::<AdminLevel>)
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        Ok(Self {
            id: row.id,
            email,
            full_name: row.full_name,
            role,
            admin_level,
            approved: row.approved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Executor-generic queries
// =============================================================================

/// Insert or overwrite a profile. Runs on a pool or inside a transaction.
///
/// An existing display name is kept when the upsert carries none.
pub(crate) async fn upsert<'e, E>(
    executor: E,
    upsert: &ProfileUpsert,
) -> Result<Profile, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, ProfileRow>(
        r"
        INSERT INTO backoffice.profile (id, email, full_name, role, admin_level, approved)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE
        SET email = EXCLUDED.email,
            full_name = COALESCE(EXCLUDED.full_name, backoffice.profile.full_name),
            role = EXCLUDED.role,
            admin_level = EXCLUDED.admin_level,
            approved = EXCLUDED.approved
        RETURNING id, email, full_name, role, admin_level, approved, created_at, updated_at
        ",
    )
    .bind(upsert.id)
    .bind(upsert.email.as_str())
    .bind(upsert.full_name.as_deref())
    .bind(upsert.role.map(Role::as_str))
    .bind(upsert.admin_level.map(AdminLevel::as_str))
    .bind(upsert.approved)
    .fetch_one(executor)
    .await
    .map_err(|e| conflict_on_unique(e, "email already belongs to another profile"))?;

    row.try_into()
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for profile database operations.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProfileRepository<'a> {
    /// Create a new repository with the given database pool.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a profile by principal ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: PrincipalId) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, email, full_name, role, admin_level, approved, created_at, updated_at
            FROM backoffice.profile
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get a profile by email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, email, full_name, role, admin_level, approved, created_at, updated_at
            FROM backoffice.profile
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// List all profiles, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Profile>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r"
            SELECT id, email, full_name, role, admin_level, approved, created_at, updated_at
            FROM backoffice.profile
            ORDER BY created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}
