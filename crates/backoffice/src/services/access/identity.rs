//! Identity resolution.
//!
//! Turns an authenticated principal into an [`AccessContext`]. Read failures
//! resolve to "no profile" so a broken lookup never grants anything.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use agency_core::{AccessCapabilities, Email, Profile, ProfileUpsert};

use crate::db::AccessStore;
use crate::models::{AccessContext, Principal};

/// Set once the bootstrap email collision has been reported.
static EMAIL_COLLISION_REPORTED: AtomicBool = AtomicBool::new(false);

/// Resolves principals against the profile store.
pub struct IdentityResolver<'a> {
    store: &'a dyn AccessStore,
    bootstrap_email: Option<&'a Email>,
}

impl<'a> IdentityResolver<'a> {
    /// Create a resolver. `bootstrap_email` names the principal that always
    /// resolves to a root admin.
    #[must_use]
    pub const fn new(store: &'a dyn AccessStore, bootstrap_email: Option<&'a Email>) -> Self {
        Self {
            store,
            bootstrap_email,
        }
    }

    /// Returns true if `principal` is the configured bootstrap principal.
    ///
    /// Exact string comparison, case included.
    #[must_use]
    pub fn is_bootstrap(&self, principal: &Principal) -> bool {
        self.bootstrap_email
            .is_some_and(|email| email.as_str() == principal.email.as_str())
    }

    /// Resolve the access context of `principal`.
    #[instrument(skip_all, fields(principal = ?principal.as_ref().map(|p| p.id)))]
    pub async fn resolve(&self, principal: Option<Principal>) -> AccessContext {
        let Some(principal) = principal else {
            return AccessContext::anonymous();
        };

        if self.is_bootstrap(&principal) {
            let profile = self.assert_root(&principal).await;
            return AccessContext::new(
                principal,
                Some(profile),
                AccessCapabilities::SUPERUSER,
                true,
            );
        }

        let profile = self.lookup(&principal).await;
        let capabilities = AccessCapabilities::classify(profile.as_ref());
        AccessContext::new(principal, profile, capabilities, false)
    }

    /// Make sure the bootstrap principal's stored profile is a root admin.
    ///
    /// Writes only when the row is missing or has drifted. A failed write still
    /// yields the root profile. When another profile already owns the bootstrap
    /// email the write cannot succeed, so it is skipped.
    async fn assert_root(&self, principal: &Principal) -> Profile {
        let upsert = ProfileUpsert::root(
            principal.id,
            principal.email.clone(),
            principal.full_name.clone(),
        );

        match self.store.profile_by_id(principal.id).await {
            Ok(Some(profile)) if upsert.is_reflected_in(&profile) => return profile,
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Failed to read bootstrap profile"),
        }

        if let Some(holder) = self.email_held_elsewhere(principal).await {
            if EMAIL_COLLISION_REPORTED.swap(true, Ordering::Relaxed) {
                debug!(holder = %holder.id, "Bootstrap email owned by another profile");
            } else {
                warn!(
                    user_id = %principal.id,
                    holder = %holder.id,
                    "Bootstrap email owned by another profile, root profile not stored"
                );
            }
            return upsert.apply(None, Utc::now());
        }

        match self.store.upsert_profile(&upsert).await {
            Ok(profile) => {
                info!(user_id = %principal.id, "Re-asserted bootstrap root profile");
                profile
            }
            Err(e) => {
                error!(error = %e, "Failed to write bootstrap root profile");
                upsert.apply(None, Utc::now())
            }
        }
    }

    /// Profile with the principal's email but a different ID, if any.
    async fn email_held_elsewhere(&self, principal: &Principal) -> Option<Profile> {
        match self.store.profile_by_email(&principal.email).await {
            Ok(found) => found.filter(|p| p.id != principal.id),
            Err(e) => {
                warn!(error = %e, "Failed to check bootstrap email ownership");
                None
            }
        }
    }

    /// Look a profile up by ID, falling back to email for rows provisioned out of band.
    async fn lookup(&self, principal: &Principal) -> Option<Profile> {
        match self.store.profile_by_id(principal.id).await {
            Ok(Some(profile)) => return Some(profile),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Profile lookup by id failed, treating as no profile");
                return None;
            }
        }

        self.store
            .profile_by_email(&principal.email)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "Profile lookup by email failed, treating as no profile");
                None
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agency_core::{AdminLevel, PrincipalId, Role};
    use uuid::Uuid;

    use super::*;
    use crate::db::MemoryStore;

    fn principal(email: &str) -> Principal {
        Principal {
            id: PrincipalId::new(Uuid::new_v4()),
            email: Email::parse(email).unwrap(),
            full_name: None,
        }
    }

    #[tokio::test]
    async fn test_anonymous_has_no_capabilities() {
        let store = MemoryStore::new();
        let ctx = IdentityResolver::new(&store, None).resolve(None).await;
        assert!(!ctx.is_authenticated());
        assert!(ctx.profile().is_none());
        assert!(!ctx.capabilities().any());
    }

    #[tokio::test]
    async fn test_bootstrap_email_is_case_sensitive() {
        let store = MemoryStore::new();
        let bootstrap = Email::parse("Root@agency.test").unwrap();
        let resolver = IdentityResolver::new(&store, Some(&bootstrap));
        assert!(resolver.is_bootstrap(&principal("Root@agency.test")));
        assert!(!resolver.is_bootstrap(&principal("root@agency.test")));
    }

    #[tokio::test]
    async fn test_fallback_lookup_by_email() {
        let store = MemoryStore::new();
        let caller = principal("author@agency.test");
        let provisioned = ProfileUpsert {
            id: PrincipalId::new(Uuid::new_v4()),
            email: caller.email.clone(),
            full_name: None,
            role: Some(Role::Author),
            admin_level: None,
            approved: true,
        };
        store.upsert_profile(&provisioned).await.unwrap();

        let ctx = IdentityResolver::new(&store, None).resolve(Some(caller)).await;
        assert!(ctx.capabilities().is_author);
    }

    #[tokio::test]
    async fn test_read_failure_fails_closed() {
        let store = MemoryStore::new();
        let caller = principal("admin@agency.test");
        store
            .upsert_profile(&ProfileUpsert {
                id: caller.id,
                email: caller.email.clone(),
                full_name: None,
                role: Some(Role::Admin),
                admin_level: Some(AdminLevel::Admin),
                approved: true,
            })
            .await
            .unwrap();

        store.set_fail_reads(true);
        let ctx = IdentityResolver::new(&store, None).resolve(Some(caller)).await;
        assert!(ctx.is_authenticated());
        assert!(!ctx.capabilities().any());
    }

    #[tokio::test]
    async fn test_bootstrap_survives_write_failure() {
        let store = MemoryStore::new();
        let root = principal("root@agency.test");
        let bootstrap = root.email.clone();
        store.set_fail_profile_writes(true);

        let ctx = IdentityResolver::new(&store, Some(&bootstrap))
            .resolve(Some(root))
            .await;
        assert!(ctx.is_bootstrap());
        assert_eq!(*ctx.capabilities(), AccessCapabilities::SUPERUSER);
        assert!(ctx.profile().unwrap().is_root());
    }

    #[tokio::test]
    async fn test_bootstrap_email_held_by_other_profile_skips_write() {
        let store = MemoryStore::new();
        let root = principal("root@agency.test");
        let bootstrap = root.email.clone();
        store
            .upsert_profile(&ProfileUpsert {
                id: PrincipalId::new(Uuid::new_v4()),
                email: bootstrap.clone(),
                full_name: None,
                role: None,
                admin_level: None,
                approved: false,
            })
            .await
            .unwrap();
        let writes_before = store.profile_write_attempts();

        let resolver = IdentityResolver::new(&store, Some(&bootstrap));
        for _ in 0..3 {
            let ctx = resolver.resolve(Some(root.clone())).await;
            assert_eq!(*ctx.capabilities(), AccessCapabilities::SUPERUSER);
            assert!(ctx.profile().unwrap().is_root());
        }

        assert_eq!(store.profile_write_attempts(), writes_before);
        assert!(store.profile_by_id(root.id).await.unwrap().is_none());
    }
}
