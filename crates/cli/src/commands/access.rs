//! Access inspection commands.
//!
//! # Usage
//!
//! ```bash
//! agency-cli access requests --status pending
//! agency-cli access show --email author@example.com
//! ```
//!
//! Read-only. Grants go through the API so they pass the role assignment policy.

use thiserror::Error;

use agency_backoffice::db::{AccessStore, PgAccessStore, RepositoryError, create_pool};
use agency_core::{AccessCapabilities, Email, EmailError, RequestStatus};

/// Errors that can occur during access commands.
#[derive(Debug, Error)]
pub enum AccessCommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("No profile for {0}")]
    NoProfile(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

async fn connect() -> Result<PgAccessStore, AccessCommandError> {
    let database_url = super::database_url()
        .ok_or(AccessCommandError::MissingEnvVar("BACKOFFICE_DATABASE_URL"))?;
    Ok(PgAccessStore::new(create_pool(&database_url).await?))
}

/// Print access requests as JSON lines.
///
/// # Errors
///
/// Returns `AccessCommandError` if the database cannot be read.
pub async fn list_requests(status: Option<RequestStatus>) -> Result<(), AccessCommandError> {
    let store = connect().await?;
    let requests = store.list_requests(status).await?;

    tracing::info!("{} request(s)", requests.len());
    for request in &requests {
        #[allow(clippy::print_stdout)]
        {
            println!("{}", serde_json::to_string(request)?);
        }
    }
    Ok(())
}

/// Print the stored profile for `email` and the capabilities it yields.
///
/// The bootstrap principal is not special-cased here; this shows the stored row.
///
/// # Errors
///
/// Returns `AccessCommandError::NoProfile` if no profile has that email.
pub async fn show(email: &str) -> Result<(), AccessCommandError> {
    let email = Email::parse(email)?;
    let store = connect().await?;

    let profile = store
        .profile_by_email(&email)
        .await?
        .ok_or_else(|| AccessCommandError::NoProfile(email.to_string()))?;
    let capabilities = AccessCapabilities::classify(Some(&profile));

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&profile)?);
        println!("{}", serde_json::to_string_pretty(&capabilities)?);
    }
    Ok(())
}
