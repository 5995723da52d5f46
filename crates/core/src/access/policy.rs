//! Role assignment policy.
//!
//! Decides which roles a principal may hand out. Callers evaluate it twice:
//! once to decide which options to offer, and again at the point of the write
//! with the reviewer's freshly resolved capabilities.

use thiserror::Error;

use super::AccessCapabilities;
use crate::types::{Profile, Role};

const ROOT_ASSIGNABLE: &[Role] = &[Role::Admin, Role::AuthorAdmin, Role::Author];
const ADMIN_ASSIGNABLE: &[Role] = &[Role::AuthorAdmin, Role::Author];
const AUTHOR_ADMIN_ASSIGNABLE: &[Role] = &[Role::Author];

/// Roles offered on the self-service request form. Requesting a role grants nothing.
pub const REQUESTABLE_ROLES: &[Role] = &Role::ALL;

/// Reasons a grant is refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    /// The acting principal may not review access requests at all.
    #[error("only admins and author admins can review access requests")]
    NotReviewer,

    /// The operation is reserved for admins.
    #[error("only admins can manage profiles")]
    NotAdmin,

    /// The acting principal may review, but not hand out this role.
    #[error("you are not allowed to grant the {0} role")]
    RoleNotAssignable(Role),

    /// The target already holds a role the acting principal may not assign.
    #[error("the requester already holds the {0} role, which you cannot change")]
    TargetOutranksReviewer(Role),
}

/// Roles the holder of `caps` may assign, most privileged first.
///
/// Principals that hold no granting capability get the requestable set, which
/// is what the self-service request form offers. It is never sufficient to grant:
/// [`check_grant`] requires a reviewer first.
#[must_use]
pub const fn assignable_roles(caps: &AccessCapabilities) -> &'static [Role] {
    if caps.is_root {
        ROOT_ASSIGNABLE
    } else if caps.is_admin {
        ADMIN_ASSIGNABLE
    } else if caps.is_author_admin {
        AUTHOR_ADMIN_ASSIGNABLE
    } else {
        REQUESTABLE_ROLES
    }
}

/// Check that the holder of `caps` may grant `role` to someone else.
///
/// # Errors
///
/// Returns [`PolicyViolation::NotReviewer`] if `caps` cannot review requests, and
/// [`PolicyViolation::RoleNotAssignable`] if `role` lies outside [`assignable_roles`].
pub fn check_grant(caps: &AccessCapabilities, role: Role) -> Result<(), PolicyViolation> {
    if !caps.can_review() {
        return Err(PolicyViolation::NotReviewer);
    }
    if !assignable_roles(caps).contains(&role) {
        return Err(PolicyViolation::RoleNotAssignable(role));
    }
    Ok(())
}

/// Check that the holder of `caps` may overwrite `current`, the profile a grant
/// would replace.
///
/// Only approved roles count. Call after [`check_grant`], which establishes that
/// `caps` can review at all.
///
/// # Errors
///
/// Returns [`PolicyViolation::TargetOutranksReviewer`] if `current` holds a role
/// outside [`assignable_roles`].
pub fn check_overwrite(caps: &AccessCapabilities, current: &Profile) -> Result<(), PolicyViolation> {
    match current.role {
        Some(role) if current.approved && !assignable_roles(caps).contains(&role) => {
            Err(PolicyViolation::TargetOutranksReviewer(role))
        }
        _ => Ok(()),
    }
}
