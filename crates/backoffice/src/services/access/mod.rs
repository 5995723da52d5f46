//! Access request workflow.
//!
//! A request is filed `pending` and is reviewed exactly once. Permission checks
//! run against the reviewer's resolved capabilities before any row is read for
//! modification; approval writes the request and the granted profile together.

mod error;
mod identity;

pub use error::AccessError;
pub use identity::IdentityResolver;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use agency_core::{
    AdminRequest, AdminRequestId, Email, NewAdminRequest, PolicyViolation, Profile, ProfileUpsert,
    RequestStatus, Role, check_grant, check_overwrite,
};

use crate::db::{AccessStore, RepositoryError};
use crate::models::{AccessContext, Principal};

/// Input for filing an access request. Unset fields default to the principal's own.
///
/// `email`, when given, must be the principal's authenticated address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitAccessRequest {
    pub email: Option<Email>,
    pub full_name: Option<String>,
    pub message: Option<String>,
    pub requested_role: Option<Role>,
}

/// Outcome of looking up the caller's own request.
///
/// `Unavailable` means the store could not answer; callers must not treat it
/// as `Absent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "request", rename_all = "snake_case")]
pub enum RequestLookup {
    Found(AdminRequest),
    Absent,
    Unavailable,
}

/// Access request workflow service.
pub struct AccessRequestService<'a> {
    store: &'a dyn AccessStore,
}

impl<'a> AccessRequestService<'a> {
    /// Create a new access request service.
    #[must_use]
    pub const fn new(store: &'a dyn AccessStore) -> Self {
        Self { store }
    }

    /// File an access request for the calling principal.
    ///
    /// # Errors
    ///
    /// - `AccessError::NotAuthenticated` without a principal
    /// - `AccessError::AlreadyPrivileged` if the caller already holds a role
    /// - `AccessError::EmailMismatch` if `input.email` is not the caller's address
    /// - `AccessError::DuplicatePending` if a request is already awaiting review
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        ctx: &AccessContext,
        input: SubmitAccessRequest,
    ) -> Result<AdminRequest, AccessError> {
        let principal = ctx.principal().ok_or(AccessError::NotAuthenticated)?;
        if ctx.is_bootstrap() || ctx.capabilities().any() {
            return Err(AccessError::AlreadyPrivileged);
        }
        if input.email.as_ref().is_some_and(|email| *email != principal.email) {
            return Err(AccessError::EmailMismatch);
        }

        let new = NewAdminRequest {
            user_id: principal.id,
            email: principal.email.clone(),
            full_name: non_blank(input.full_name).or_else(|| principal.full_name.clone()),
            message: non_blank(input.message),
            requested_role: input.requested_role,
        };

        let request = self.store.create_request(&new).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AccessError::DuplicatePending,
            other => AccessError::Repository(other),
        })?;

        info!(
            request_id = %request.id,
            user_id = %request.user_id,
            requested_role = ?request.requested_role,
            "Access request submitted"
        );
        Ok(request)
    }

    /// Approve a pending request, granting `role` to its requester.
    ///
    /// # Errors
    ///
    /// - `AccessError::NotAuthenticated` without a principal
    /// - `AccessError::PermissionDenied` if the caller may not grant `role`, or
    ///   the requester now holds a role the caller may not change
    /// - `AccessError::NotFound` / `AccessError::AlreadyReviewed` from the request's state
    #[instrument(skip_all, fields(request_id = %id, role = %role))]
    pub async fn approve(
        &self,
        ctx: &AccessContext,
        id: AdminRequestId,
        role: Role,
    ) -> Result<(AdminRequest, Profile), AccessError> {
        let reviewer = authorize_review(ctx, Some(role))?;
        let request = self.pending_request(id).await?;
        if let Some(current) = self.store.profile_by_id(request.user_id).await? {
            check_overwrite(ctx.capabilities(), &current)?;
        }
        let grant = ProfileUpsert::for_approval(&request, role);

        let (request, profile) = match self.store.approve_request(id, reviewer.id, &grant).await {
            Ok(approved) => approved,
            Err(e) => return Err(self.review_error(id, e).await),
        };

        info!(
            request_id = %request.id,
            reviewer = %reviewer.id,
            user_id = %profile.id,
            role = %role,
            "Access request approved"
        );
        Ok((request, profile))
    }

    /// Reject a pending request. The requester's profile is left alone.
    ///
    /// # Errors
    ///
    /// Same as [`Self::approve`], minus the role check.
    #[instrument(skip_all, fields(request_id = %id))]
    pub async fn reject(
        &self,
        ctx: &AccessContext,
        id: AdminRequestId,
    ) -> Result<AdminRequest, AccessError> {
        let reviewer = authorize_review(ctx, None)?;
        self.pending_request(id).await?;

        let request = match self.store.reject_request(id, reviewer.id).await {
            Ok(request) => request,
            Err(e) => return Err(self.review_error(id, e).await),
        };

        info!(request_id = %request.id, reviewer = %reviewer.id, "Access request rejected");
        Ok(request)
    }

    /// Latest request filed by the caller.
    ///
    /// Anonymous callers and the bootstrap principal never have one.
    #[instrument(skip_all)]
    pub async fn own_request(&self, ctx: &AccessContext) -> RequestLookup {
        let Some(principal) = ctx.principal() else {
            return RequestLookup::Absent;
        };
        if ctx.is_bootstrap() {
            return RequestLookup::Absent;
        }

        match self.store.latest_request_for_user(principal.id).await {
            Ok(Some(request)) => RequestLookup::Found(request),
            Ok(None) => RequestLookup::Absent,
            Err(e) => {
                warn!(error = %e, user_id = %principal.id, "Failed to load own access request");
                RequestLookup::Unavailable
            }
        }
    }

    /// List requests for review, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::PermissionDenied` unless the caller can review.
    #[instrument(skip_all, fields(status = ?status))]
    pub async fn list_requests(
        &self,
        ctx: &AccessContext,
        status: Option<RequestStatus>,
    ) -> Result<Vec<AdminRequest>, AccessError> {
        authorize_review(ctx, None)?;
        Ok(self.store.list_requests(status).await?)
    }

    /// List all profiles.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::PermissionDenied` unless the caller is an admin.
    #[instrument(skip_all)]
    pub async fn list_profiles(&self, ctx: &AccessContext) -> Result<Vec<Profile>, AccessError> {
        if !ctx.is_authenticated() {
            return Err(AccessError::NotAuthenticated);
        }
        if !ctx.capabilities().is_admin {
            return Err(PolicyViolation::NotAdmin.into());
        }
        Ok(self.store.list_profiles().await?)
    }

    async fn pending_request(&self, id: AdminRequestId) -> Result<AdminRequest, AccessError> {
        let request = self
            .store
            .request_by_id(id)
            .await?
            .ok_or(AccessError::NotFound(id))?;
        if !request.is_pending() {
            return Err(AccessError::AlreadyReviewed(id));
        }
        Ok(request)
    }

    /// Translate a failed review write.
    ///
    /// A `Conflict` is only reported as `AlreadyReviewed` if the request really
    /// left `pending`; profile constraint failures stay repository errors.
    async fn review_error(&self, id: AdminRequestId, e: RepositoryError) -> AccessError {
        match e {
            RepositoryError::NotFound => AccessError::NotFound(id),
            RepositoryError::Conflict(_) => match self.store.request_by_id(id).await {
                Ok(Some(current)) if !current.is_pending() => AccessError::AlreadyReviewed(id),
                _ => AccessError::Repository(e),
            },
            other => AccessError::Repository(other),
        }
    }
}

/// Check that the caller may review, and may grant `role` if one is given.
fn authorize_review(ctx: &AccessContext, role: Option<Role>) -> Result<&Principal, AccessError> {
    let principal = ctx.principal().ok_or(AccessError::NotAuthenticated)?;
    let caps = ctx.capabilities();
    match role {
        Some(role) => check_grant(caps, role)?,
        None if !caps.can_review() => return Err(PolicyViolation::NotReviewer.into()),
        None => {}
    }
    Ok(principal)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use agency_core::{AccessCapabilities, PrincipalId};
    use uuid::Uuid;

    use super::*;
    use crate::db::MemoryStore;

    fn principal(email: &str) -> Principal {
        Principal {
            id: PrincipalId::new(Uuid::new_v4()),
            email: Email::parse(email).unwrap(),
            full_name: Some("Test Person".to_owned()),
        }
    }

    fn ctx_with(caps: AccessCapabilities) -> AccessContext {
        AccessContext::new(principal("caller@agency.test"), None, caps, false)
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  hi ".to_owned())).as_deref(), Some("hi"));
        assert_eq!(non_blank(Some("   ".to_owned())), None);
        assert_eq!(non_blank(None), None);
    }

    #[tokio::test]
    async fn test_submit_defaults_to_principal_identity() {
        let store = MemoryStore::new();
        let ctx = ctx_with(AccessCapabilities::NONE);
        let request = AccessRequestService::new(&store)
            .submit(&ctx, SubmitAccessRequest::default())
            .await
            .unwrap();

        let principal = ctx.principal().unwrap();
        assert_eq!(request.user_id, principal.id);
        assert_eq!(request.email, principal.email);
        assert_eq!(request.full_name.as_deref(), Some("Test Person"));
        assert_eq!(request.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_requires_authentication() {
        let store = MemoryStore::new();
        let err = AccessRequestService::new(&store)
            .submit(&AccessContext::anonymous(), SubmitAccessRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_reviewer_gate_runs_before_lookup() {
        let store = MemoryStore::new();
        let ctx = ctx_with(AccessCapabilities::NONE);
        let err = AccessRequestService::new(&store)
            .reject(&ctx, AdminRequestId::new(42))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccessError::PermissionDenied(PolicyViolation::NotReviewer)
        ));
    }

    #[tokio::test]
    async fn test_list_profiles_is_admin_only() {
        let store = MemoryStore::new();
        let author_admin = ctx_with(AccessCapabilities {
            is_author_admin: true,
            ..AccessCapabilities::NONE
        });
        let err = AccessRequestService::new(&store)
            .list_profiles(&author_admin)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AccessError::PermissionDenied(PolicyViolation::NotAdmin)
        ));
    }

    #[tokio::test]
    async fn test_own_request_unavailable_is_not_absent() {
        let store = MemoryStore::new();
        let ctx = ctx_with(AccessCapabilities::NONE);
        let service = AccessRequestService::new(&store);
        service.submit(&ctx, SubmitAccessRequest::default()).await.unwrap();

        store.set_fail_reads(true);
        assert_eq!(service.own_request(&ctx).await, RequestLookup::Unavailable);
    }

    #[tokio::test]
    async fn test_submit_rejects_foreign_email() {
        let store = MemoryStore::new();
        let ctx = ctx_with(AccessCapabilities::NONE);
        let service = AccessRequestService::new(&store);

        let err = service
            .submit(
                &ctx,
                SubmitAccessRequest {
                    email: Some(Email::parse("colleague@agency.test").unwrap()),
                    ..SubmitAccessRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::EmailMismatch));
        assert_eq!(service.own_request(&ctx).await, RequestLookup::Absent);

        let own = ctx.principal().unwrap().email.clone();
        let request = service
            .submit(
                &ctx,
                SubmitAccessRequest {
                    email: Some(own.clone()),
                    ..SubmitAccessRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(request.email, own);
    }
}
