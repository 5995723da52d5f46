//! Caller identity and capability handlers.

use axum::Json;
use serde::Serialize;
use tracing::instrument;

use agency_core::{AccessCapabilities, Profile, Role, assignable_roles};

use crate::middleware::CurrentAccess;
use crate::models::Principal;

/// Where callers without any capability are sent.
pub const LANDING_PATH: &str = "/";

/// Response for `GET /api/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub principal: Option<Principal>,
    pub profile: Option<Profile>,
    #[serde(flatten)]
    pub capabilities: AccessCapabilities,
    pub bootstrap: bool,
    pub assignable_roles: &'static [Role],
    /// Set when the caller holds no capability and should leave the back-office.
    pub landing: Option<&'static str>,
}

/// Response for `GET /api/roles/assignable`.
#[derive(Debug, Serialize)]
pub struct AssignableRolesResponse {
    pub roles: &'static [Role],
}

/// Show the caller's resolved access.
///
/// GET /api/me
#[instrument(skip_all)]
pub async fn show(CurrentAccess(ctx): CurrentAccess) -> Json<MeResponse> {
    let capabilities = *ctx.capabilities();

    Json(MeResponse {
        principal: ctx.principal().cloned(),
        profile: ctx.profile().cloned(),
        capabilities,
        bootstrap: ctx.is_bootstrap(),
        assignable_roles: assignable_roles(&capabilities),
        landing: (!capabilities.any()).then_some(LANDING_PATH),
    })
}

/// Roles the caller may grant. Callers without a granting capability get the
/// requestable set.
///
/// GET /api/roles/assignable
pub async fn assignable(CurrentAccess(ctx): CurrentAccess) -> Json<AssignableRolesResponse> {
    Json(AssignableRolesResponse {
        roles: assignable_roles(ctx.capabilities()),
    })
}
