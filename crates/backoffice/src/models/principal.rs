//! Authenticated principal and the access context resolved for it.

use serde::{Deserialize, Serialize};

use agency_core::{AccessCapabilities, Email, PrincipalId, Profile};

/// Identity vouched for by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Auth provider's user ID.
    pub id: PrincipalId,
    /// Email address on the auth account.
    pub email: Email,
    /// Display name from the account metadata.
    pub full_name: Option<String>,
}

/// Everything the back-office knows about the caller of one request.
///
/// Built once by the identity resolver and passed to services by reference.
/// Capabilities are never re-derived downstream.
#[derive(Debug, Clone)]
pub struct AccessContext {
    principal: Option<Principal>,
    profile: Option<Profile>,
    capabilities: AccessCapabilities,
    bootstrap: bool,
}

impl AccessContext {
    /// Context of a caller without credentials.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            principal: None,
            profile: None,
            capabilities: AccessCapabilities::NONE,
            bootstrap: false,
        }
    }

    pub(crate) const fn new(
        principal: Principal,
        profile: Option<Profile>,
        capabilities: AccessCapabilities,
        bootstrap: bool,
    ) -> Self {
        Self {
            principal: Some(principal),
            profile,
            capabilities,
            bootstrap,
        }
    }

    /// The authenticated principal, if any.
    #[must_use]
    pub const fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// The resolved profile, if any.
    #[must_use]
    pub const fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    #[must_use]
    pub const fn capabilities(&self) -> &AccessCapabilities {
        &self.capabilities
    }

    /// Returns true if the caller is the configured bootstrap principal.
    #[must_use]
    pub const fn is_bootstrap(&self) -> bool {
        self.bootstrap
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }
}
