//! Profile domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdminLevel, AdminRequest, Email, PrincipalId, Role};

/// Stored role and approval state of a principal. At most one per principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same ID the auth provider assigns to the principal.
    pub id: PrincipalId,
    /// Principal's email address.
    pub email: Email,
    /// Display name.
    pub full_name: Option<String>,
    /// Assigned role, `None` until one is granted.
    pub role: Option<Role>,
    /// Admin level, only meaningful when `role` is [`Role::Admin`].
    pub admin_level: Option<AdminLevel>,
    /// A role grants nothing until this is set.
    pub approved: bool,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last written.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Returns true for an approved root admin.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.approved
            && self.role == Some(Role::Admin)
            && self.admin_level == Some(AdminLevel::Root)
    }
}

/// Full set of writable profile fields, written with insert-or-overwrite semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpsert {
    pub id: PrincipalId,
    pub email: Email,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub admin_level: Option<AdminLevel>,
    pub approved: bool,
}

impl ProfileUpsert {
    /// The profile forced onto the bootstrap principal.
    #[must_use]
    pub fn root(id: PrincipalId, email: Email, full_name: Option<String>) -> Self {
        Self {
            id,
            email,
            full_name,
            role: Some(Role::Admin),
            admin_level: Some(AdminLevel::Root),
            approved: true,
        }
    }

    /// The profile written when `request` is approved with `role`.
    ///
    /// Granting `admin` yields a regular admin; root is never granted through a request.
    #[must_use]
    pub fn for_approval(request: &AdminRequest, role: Role) -> Self {
        Self {
            id: request.user_id,
            email: request.email.clone(),
            full_name: request.full_name.clone(),
            role: Some(role),
            admin_level: (role == Role::Admin).then_some(AdminLevel::Admin),
            approved: true,
        }
    }

    /// Returns true if `profile` already holds this role state.
    ///
    /// Display name and timestamps are ignored.
    #[must_use]
    pub fn is_reflected_in(&self, profile: &Profile) -> bool {
        profile.id == self.id
            && profile.email == self.email
            && profile.role == self.role
            && profile.admin_level == self.admin_level
            && profile.approved == self.approved
    }

    /// Materialize the profile this upsert produces over `existing` at `now`.
    ///
    /// Keeps the creation time and the display name of an existing row when the
    /// upsert carries none.
    #[must_use]
    pub fn apply(&self, existing: Option<&Profile>, now: DateTime<Utc>) -> Profile {
        Profile {
            id: self.id,
            email: self.email.clone(),
            full_name: self
                .full_name
                .clone()
                .or_else(|| existing.and_then(|p| p.full_name.clone())),
            role: self.role,
            admin_level: self.admin_level,
            approved: self.approved,
            created_at: existing.map_or(now, |p| p.created_at),
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::{AdminRequestId, RequestStatus};

    fn request(role: Option<Role>) -> AdminRequest {
        AdminRequest {
            id: AdminRequestId::new(1),
            user_id: PrincipalId::new(Uuid::new_v4()),
            email: Email::parse("writer@agency.test").unwrap(),
            full_name: Some("Wren Writer".to_owned()),
            message: None,
            requested_role: role,
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
        }
    }

    #[test]
    fn test_for_approval_copies_request_identity() {
        let req = request(Some(Role::Admin));
        let upsert = ProfileUpsert::for_approval(&req, Role::Author);
        assert_eq!(upsert.id, req.user_id);
        assert_eq!(upsert.email, req.email);
        assert_eq!(upsert.full_name.as_deref(), Some("Wren Writer"));
        assert_eq!(upsert.role, Some(Role::Author));
        assert_eq!(upsert.admin_level, None);
        assert!(upsert.approved);
    }

    #[test]
    fn test_for_approval_admin_is_never_root() {
        let upsert = ProfileUpsert::for_approval(&request(None), Role::Admin);
        assert_eq!(upsert.admin_level, Some(AdminLevel::Admin));
    }

    #[test]
    fn test_apply_preserves_created_at_and_name() {
        let id = PrincipalId::new(Uuid::new_v4());
        let email = Email::parse("root@agency.test").unwrap();
        let earlier = Utc::now() - chrono::Duration::days(3);
        let existing = Profile {
            id,
            email: email.clone(),
            full_name: Some("Rooty".to_owned()),
            role: Some(Role::Author),
            admin_level: None,
            approved: false,
            created_at: earlier,
            updated_at: earlier,
        };

        let now = Utc::now();
        let profile = ProfileUpsert::root(id, email, None).apply(Some(&existing), now);
        assert_eq!(profile.created_at, earlier);
        assert_eq!(profile.updated_at, now);
        assert_eq!(profile.full_name.as_deref(), Some("Rooty"));
        assert!(profile.is_root());
    }

    #[test]
    fn test_is_reflected_in_detects_drift() {
        let id = PrincipalId::new(Uuid::new_v4());
        let email = Email::parse("root@agency.test").unwrap();
        let upsert = ProfileUpsert::root(id, email, None);
        let mut profile = upsert.apply(None, Utc::now());
        assert!(upsert.is_reflected_in(&profile));

        profile.admin_level = Some(AdminLevel::Admin);
        assert!(!upsert.is_reflected_in(&profile));
    }
}
