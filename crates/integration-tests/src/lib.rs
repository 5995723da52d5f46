//! Integration tests for the agency back-office.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p agency-integration-tests
//! ```
//!
//! Tests run against [`MemoryStore`]; no database is needed.
//!
//! # Test Categories
//!
//! - `access_workflow` - Identity resolution and the request state machine
//! - `access_routes` - HTTP surface through the router

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use axum::Router;
use jsonwebtoken::{EncodingKey, Header};
use secrecy::SecretString;
use uuid::Uuid;

use agency_backoffice::config::{AuthConfig, BackofficeConfig};
use agency_backoffice::db::{AccessStore, MemoryStore};
use agency_backoffice::middleware::{Claims, UserMetadata};
use agency_backoffice::models::{AccessContext, Principal};
use agency_backoffice::services::{AccessRequestService, IdentityResolver};
use agency_backoffice::state::AppState;
use agency_core::{AdminLevel, Email, PrincipalId, Profile, ProfileUpsert, Role};

/// HS256 secret shared by the test verifier and [`mint_token`].
pub const TEST_JWT_SECRET: &str = "k7Qp2vXz9LmN4rTs8wYb1cHf6gJd3eAu";

/// Audience the test verifier expects.
pub const TEST_AUDIENCE: &str = "authenticated";

/// Bootstrap principal of every [`TestEnv`].
pub const BOOTSTRAP_EMAIL: &str = "root@agency.test";

/// Configuration pointing at nothing real.
#[must_use]
pub fn test_config() -> BackofficeConfig {
    BackofficeConfig {
        database_url: SecretString::from("postgres://unused".to_string()),
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        bootstrap_email: Email::parse(BOOTSTRAP_EMAIL).ok(),
        auth: AuthConfig {
            jwt_secret: SecretString::from(TEST_JWT_SECRET.to_string()),
            audience: TEST_AUDIENCE.to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
        tls: None,
    }
}

/// A fresh principal with a random ID.
///
/// # Panics
///
/// Panics if `email` is not a valid address.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn principal(email: &str) -> Principal {
    Principal {
        id: PrincipalId::new(Uuid::new_v4()),
        email: Email::parse(email).unwrap(),
        full_name: None,
    }
}

/// Sign a token for `principal` the way the auth provider would.
///
/// # Panics
///
/// Panics if encoding fails.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn mint_token(principal: &Principal) -> String {
    let claims = Claims {
        sub: principal.id.as_uuid(),
        email: principal.email.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        aud: Some(TEST_AUDIENCE.to_string()),
        user_metadata: principal.full_name.clone().map(|full_name| UserMetadata {
            full_name: Some(full_name),
        }),
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// In-memory store plus application state wired to it.
pub struct TestEnv {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    #[must_use]
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone());
        Self { store, state }
    }

    /// The bootstrap principal, with a fresh ID.
    #[must_use]
    pub fn bootstrap_principal() -> Principal {
        principal(BOOTSTRAP_EMAIL)
    }

    #[must_use]
    pub fn service(&self) -> AccessRequestService<'_> {
        AccessRequestService::new(self.store.as_ref())
    }

    /// Resolve `principal` exactly as an HTTP request would.
    pub async fn context(&self, principal: Option<&Principal>) -> AccessContext {
        IdentityResolver::new(self.store.as_ref(), self.state.bootstrap_email())
            .resolve(principal.cloned())
            .await
    }

    /// Store a profile for `principal`.
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the write.
    #[allow(clippy::unwrap_used)]
    pub async fn seed_profile(
        &self,
        principal: &Principal,
        role: Option<Role>,
        admin_level: Option<AdminLevel>,
        approved: bool,
    ) -> Profile {
        self.store
            .upsert_profile(&ProfileUpsert {
                id: principal.id,
                email: principal.email.clone(),
                full_name: principal.full_name.clone(),
                role,
                admin_level,
                approved,
            })
            .await
            .unwrap()
    }

    /// Seed an approved principal holding `role`, and return it.
    pub async fn member(&self, email: &str, role: Role, admin_level: Option<AdminLevel>) -> Principal {
        let p = principal(email);
        self.seed_profile(&p, Some(role), admin_level, true).await;
        p
    }

    /// The full router, without Sentry layers.
    #[must_use]
    pub fn router(&self) -> Router {
        agency_backoffice::app(self.state.clone())
    }
}
