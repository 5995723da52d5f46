//! Access rules shared by every decision point.
//!
//! - [`capabilities`] - Permission classifier (profile to capability flags)
//! - [`policy`] - Role assignment policy (capability flags to grantable roles)

pub mod capabilities;
pub mod policy;

pub use capabilities::AccessCapabilities;
pub use policy::{PolicyViolation, REQUESTABLE_ROLES, assignable_roles, check_grant, check_overwrite};
