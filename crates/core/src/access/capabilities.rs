//! Permission classifier.
//!
//! Derives the four capability flags from a profile. The result is computed
//! once per request and handed to every consumer rather than re-derived.

use serde::Serialize;

use crate::types::{AdminLevel, Profile, Role};

/// Capabilities a principal holds, derived from its profile.
///
/// `is_root` implies `is_admin`. Since a profile has a single role,
/// `is_admin`, `is_author_admin` and `is_author` are mutually exclusive except
/// for the bootstrap principal, which holds all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AccessCapabilities {
    pub is_admin: bool,
    pub is_root: bool,
    pub is_author_admin: bool,
    pub is_author: bool,
}

impl AccessCapabilities {
    /// No capability. Anonymous principals, principals without a profile and
    /// unapproved profiles all classify as this.
    pub const NONE: Self = Self {
        is_admin: false,
        is_root: false,
        is_author_admin: false,
        is_author: false,
    };

    /// Every capability. Reserved for the bootstrap principal.
    pub const SUPERUSER: Self = Self {
        is_admin: true,
        is_root: true,
        is_author_admin: true,
        is_author: true,
    };

    /// Classify a stored profile.
    #[must_use]
    pub fn classify(profile: Option<&Profile>) -> Self {
        let Some(profile) = profile.filter(|p| p.approved) else {
            return Self::NONE;
        };

        let is_admin = profile.role == Some(Role::Admin);
        Self {
            is_admin,
            is_root: is_admin && profile.admin_level == Some(AdminLevel::Root),
            is_author_admin: profile.role == Some(Role::AuthorAdmin),
            is_author: profile.role == Some(Role::Author),
        }
    }

    /// Returns true if any capability is held. Principals without one belong on
    /// the public landing page.
    #[must_use]
    pub const fn any(&self) -> bool {
        self.is_admin || self.is_root || self.is_author_admin || self.is_author
    }

    /// Returns true if the principal may approve or reject access requests.
    #[must_use]
    pub const fn can_review(&self) -> bool {
        self.is_admin || self.is_author_admin
    }
}
