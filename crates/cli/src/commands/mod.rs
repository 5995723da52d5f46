//! CLI subcommands.

pub mod access;
pub mod migrate;

use secrecy::SecretString;

/// Read the back-office database URL, falling back to `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();

    std::env::var("BACKOFFICE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}
