//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! agency-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BACKOFFICE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Back-office migrations: `crates/backoffice/migrations/`

use agency_backoffice::db;
use thiserror::Error;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run back-office database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn backoffice() -> Result<(), MigrationError> {
    let database_url =
        super::database_url().ok_or(MigrationError::MissingEnvVar("BACKOFFICE_DATABASE_URL"))?;

    tracing::info!("Connecting to back-office database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running back-office migrations...");
    sqlx::migrate!("../backoffice/migrations").run(&pool).await?;

    tracing::info!("Back-office migrations complete!");
    Ok(())
}
