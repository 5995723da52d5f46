//! Application state shared across handlers.

use std::sync::Arc;

use agency_core::Email;

use crate::config::BackofficeConfig;
use crate::db::AccessStore;
use crate::middleware::TokenVerifier;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: BackofficeConfig,
    store: Arc<dyn AccessStore>,
    verifier: TokenVerifier,
}

impl AppState {
    /// Create the state over a store. The token verifier is built from `config.auth`.
    #[must_use]
    pub fn new(config: BackofficeConfig, store: Arc<dyn AccessStore>) -> Self {
        let verifier = TokenVerifier::new(&config.auth);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                verifier,
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn AccessStore {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn verifier(&self) -> &TokenVerifier {
        &self.inner.verifier
    }

    /// Principal that always resolves to a root admin, if configured.
    #[must_use]
    pub fn bootstrap_email(&self) -> Option<&Email> {
        self.inner.config.bootstrap_email.as_ref()
    }
}
