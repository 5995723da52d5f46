//! Integration tests for identity resolution and the access request workflow.
//!
//! Every test resolves principals through the identity resolver, so the
//! capabilities under test are the ones an HTTP request would see.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use agency_backoffice::db::AccessStore;
use agency_backoffice::services::{AccessError, RequestLookup, SubmitAccessRequest};
use agency_core::{
    AccessCapabilities, AdminLevel, AdminRequestId, PolicyViolation, ProfileUpsert, RequestStatus,
    Role,
};
use agency_integration_tests::{TestEnv, principal};

fn request_for(role: Role) -> SubmitAccessRequest {
    SubmitAccessRequest {
        message: Some("I run the blog".to_owned()),
        requested_role: Some(role),
        ..SubmitAccessRequest::default()
    }
}

// =============================================================================
// Identity and capabilities
// =============================================================================

#[tokio::test]
async fn test_approved_author_is_only_author() {
    let env = TestEnv::new();
    let author = env.member("author@agency.test", Role::Author, None).await;

    let ctx = env.context(Some(&author)).await;
    assert_eq!(
        *ctx.capabilities(),
        AccessCapabilities {
            is_author: true,
            ..AccessCapabilities::NONE
        }
    );
}

#[tokio::test]
async fn test_bootstrap_without_profile_becomes_root() {
    let env = TestEnv::new();
    let root = TestEnv::bootstrap_principal();

    let ctx = env.context(Some(&root)).await;
    assert_eq!(*ctx.capabilities(), AccessCapabilities::SUPERUSER);

    let stored = env.store.profile_by_id(root.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Some(Role::Admin));
    assert_eq!(stored.admin_level, Some(AdminLevel::Root));
    assert!(stored.approved);
}

#[tokio::test]
async fn test_bootstrap_drift_is_reverted() {
    let env = TestEnv::new();
    let root = TestEnv::bootstrap_principal();
    env.seed_profile(&root, Some(Role::Author), None, false).await;

    let ctx = env.context(Some(&root)).await;
    assert_eq!(*ctx.capabilities(), AccessCapabilities::SUPERUSER);
    assert!(ctx.profile().unwrap().is_root());

    let stored = env.store.profile_by_id(root.id).await.unwrap().unwrap();
    assert!(stored.is_root());
}

#[tokio::test]
async fn test_bootstrap_in_sync_is_not_rewritten() {
    let env = TestEnv::new();
    let root = TestEnv::bootstrap_principal();
    let first = env.context(Some(&root)).await;
    let written_at = first.profile().unwrap().updated_at;

    // A failing write would surface as a synthesized profile with a new timestamp.
    env.store.set_fail_profile_writes(true);
    let second = env.context(Some(&root)).await;
    assert_eq!(second.profile().unwrap().updated_at, written_at);
}

#[tokio::test]
async fn test_unapproved_profiles_grant_nothing() {
    let env = TestEnv::new();
    for role in Role::ALL {
        let p = principal(&format!("{role}@agency.test"));
        env.seed_profile(&p, Some(role), Some(AdminLevel::Root), false)
            .await;
        let ctx = env.context(Some(&p)).await;
        assert!(!ctx.capabilities().any(), "unapproved {role} must grant nothing");
    }
}

// =============================================================================
// Submit
// =============================================================================

#[tokio::test]
async fn test_privileged_principals_cannot_submit() {
    let env = TestEnv::new();
    let author = env.member("author@agency.test", Role::Author, None).await;
    let root = TestEnv::bootstrap_principal();

    for p in [author, root] {
        let ctx = env.context(Some(&p)).await;
        let err = env
            .service()
            .submit(&ctx, request_for(Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AlreadyPrivileged), "{p:?}");
    }
}

#[tokio::test]
async fn test_second_pending_request_is_refused() {
    let env = TestEnv::new();
    let requester = principal("new@agency.test");
    let ctx = env.context(Some(&requester)).await;

    env.service()
        .submit(&ctx, request_for(Role::Author))
        .await
        .unwrap();
    let err = env
        .service()
        .submit(&ctx, request_for(Role::Admin))
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::DuplicatePending));
}

// =============================================================================
// Approve / reject
// =============================================================================

#[tokio::test]
async fn test_author_admin_cannot_grant_admin() {
    let env = TestEnv::new();
    let reviewer = env
        .member("editor@agency.test", Role::AuthorAdmin, None)
        .await;
    let requester = principal("new@agency.test");

    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Admin))
        .await
        .unwrap();

    let ctx = env.context(Some(&reviewer)).await;
    let err = env
        .service()
        .approve(&ctx, request.id, Role::Admin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccessError::PermissionDenied(PolicyViolation::RoleNotAssignable(Role::Admin))
    ));

    let stored = env.store.request_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_root_approves_author_admin() {
    let env = TestEnv::new();
    let root = env
        .member("chief@agency.test", Role::Admin, Some(AdminLevel::Root))
        .await;
    let requester = principal("new@agency.test");

    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Admin))
        .await
        .unwrap();

    let ctx = env.context(Some(&root)).await;
    let (approved, profile) = env
        .service()
        .approve(&ctx, request.id, Role::AuthorAdmin)
        .await
        .unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(root.id));
    assert!(approved.reviewed_at.is_some());
    assert_eq!(profile.id, requester.id);
    assert_eq!(profile.role, Some(Role::AuthorAdmin));
    assert!(profile.approved);

    let requester_ctx = env.context(Some(&requester)).await;
    assert!(requester_ctx.capabilities().is_author_admin);
}

#[tokio::test]
async fn test_granted_admin_is_not_root() {
    let env = TestEnv::new();
    let root = TestEnv::bootstrap_principal();
    let requester = principal("new@agency.test");

    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Admin))
        .await
        .unwrap();
    let (_, profile) = env
        .service()
        .approve(&env.context(Some(&root)).await, request.id, Role::Admin)
        .await
        .unwrap();

    assert_eq!(profile.admin_level, Some(AdminLevel::Admin));
    let ctx = env.context(Some(&requester)).await;
    assert!(ctx.capabilities().is_admin);
    assert!(!ctx.capabilities().is_root);
}

#[tokio::test]
async fn test_denied_approval_never_touches_profile() {
    let env = TestEnv::new();
    let admin = env
        .member("admin@agency.test", Role::Admin, Some(AdminLevel::Admin))
        .await;
    let requester = principal("new@agency.test");
    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Admin))
        .await
        .unwrap();

    let ctx = env.context(Some(&admin)).await;
    for _ in 0..2 {
        let err = env
            .service()
            .approve(&ctx, request.id, Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::PermissionDenied(_)));
        assert!(env.store.profile_by_id(requester.id).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn test_stale_request_cannot_demote_higher_profile() {
    let env = TestEnv::new();
    let admin = env
        .member("admin@agency.test", Role::Admin, Some(AdminLevel::Admin))
        .await;
    let requester = principal("new@agency.test");
    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Author))
        .await
        .unwrap();

    // Provisioned as root after the request was filed.
    let provisioned = env
        .seed_profile(&requester, Some(Role::Admin), Some(AdminLevel::Root), true)
        .await;

    let err = env
        .service()
        .approve(&env.context(Some(&admin)).await, request.id, Role::AuthorAdmin)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccessError::PermissionDenied(PolicyViolation::TargetOutranksReviewer(Role::Admin))
    ));

    let stored = env.store.profile_by_id(requester.id).await.unwrap().unwrap();
    assert_eq!(stored, provisioned);
    let request = env.store.request_by_id(request.id).await.unwrap().unwrap();
    assert!(request.is_pending());

    // A root reviewer may still settle it.
    let root_ctx = env.context(Some(&TestEnv::bootstrap_principal())).await;
    env.service()
        .approve(&root_ctx, request.id, Role::AuthorAdmin)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reviewed_requests_are_terminal() {
    let env = TestEnv::new();
    let root = TestEnv::bootstrap_principal();
    let root_ctx = env.context(Some(&root)).await;
    let service = env.service();

    let first = principal("first@agency.test");
    let approved = service
        .submit(&env.context(Some(&first)).await, request_for(Role::Author))
        .await
        .unwrap();
    service
        .approve(&root_ctx, approved.id, Role::Author)
        .await
        .unwrap();

    let second = principal("second@agency.test");
    let rejected = service
        .submit(&env.context(Some(&second)).await, request_for(Role::Author))
        .await
        .unwrap();
    service.reject(&root_ctx, rejected.id).await.unwrap();

    for id in [approved.id, rejected.id] {
        let before = env.store.request_by_id(id).await.unwrap().unwrap();

        let err = service.approve(&root_ctx, id, Role::Admin).await.unwrap_err();
        assert!(matches!(err, AccessError::AlreadyReviewed(_)));
        let err = service.reject(&root_ctx, id).await.unwrap_err();
        assert!(matches!(err, AccessError::AlreadyReviewed(_)));

        let after = env.store.request_by_id(id).await.unwrap().unwrap();
        assert_eq!(before, after);
    }

    // Rejection leaves the requester without a profile.
    assert!(env.store.profile_by_id(second.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_request_is_not_found() {
    let env = TestEnv::new();
    let root_ctx = env.context(Some(&TestEnv::bootstrap_principal())).await;
    let err = env
        .service()
        .approve(&root_ctx, AdminRequestId::new(404), Role::Author)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::NotFound(id) if id == AdminRequestId::new(404)));
}

#[tokio::test]
async fn test_failed_profile_write_keeps_request_pending() {
    let env = TestEnv::new();
    let root_ctx = env.context(Some(&TestEnv::bootstrap_principal())).await;
    let requester = principal("new@agency.test");
    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Author))
        .await
        .unwrap();

    env.store.set_fail_profile_writes(true);
    let err = env
        .service()
        .approve(&root_ctx, request.id, Role::Author)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Repository(_)));

    let stored = env.store.request_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert!(stored.reviewed_by.is_none());
    assert!(env.store.profile_by_id(requester.id).await.unwrap().is_none());

    env.store.set_fail_profile_writes(false);
    env.service()
        .approve(&root_ctx, request.id, Role::Author)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_profile_email_conflict_is_not_reported_as_reviewed() {
    let env = TestEnv::new();
    let root_ctx = env.context(Some(&TestEnv::bootstrap_principal())).await;
    let requester = principal("new@agency.test");
    let request = env
        .service()
        .submit(&env.context(Some(&requester)).await, request_for(Role::Author))
        .await
        .unwrap();

    // Another profile already owns the email on the request.
    let squatter = principal("new@agency.test");
    env.store
        .upsert_profile(&ProfileUpsert {
            id: squatter.id,
            email: squatter.email.clone(),
            full_name: None,
            role: None,
            admin_level: None,
            approved: false,
        })
        .await
        .unwrap();

    let err = env
        .service()
        .approve(&root_ctx, request.id, Role::Author)
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Repository(_)));
    let stored = env.store.request_by_id(request.id).await.unwrap().unwrap();
    assert!(stored.is_pending());
}

// =============================================================================
// Own request
// =============================================================================

#[tokio::test]
async fn test_anonymous_and_bootstrap_have_no_request() {
    let env = TestEnv::new();
    let anonymous = env.context(None).await;
    assert_eq!(env.service().own_request(&anonymous).await, RequestLookup::Absent);

    let root = env.context(Some(&TestEnv::bootstrap_principal())).await;
    assert_eq!(env.service().own_request(&root).await, RequestLookup::Absent);
}

#[tokio::test]
async fn test_own_request_reflects_latest_state() {
    let env = TestEnv::new();
    let requester = principal("new@agency.test");
    let ctx = env.context(Some(&requester)).await;
    assert_eq!(env.service().own_request(&ctx).await, RequestLookup::Absent);

    let request = env
        .service()
        .submit(&ctx, request_for(Role::Author))
        .await
        .unwrap();
    let root_ctx = env.context(Some(&TestEnv::bootstrap_principal())).await;
    env.service().reject(&root_ctx, request.id).await.unwrap();

    match env.service().own_request(&ctx).await {
        RequestLookup::Found(found) => {
            assert_eq!(found.id, request.id);
            assert_eq!(found.status, RequestStatus::Rejected);
        }
        other => panic!("expected the rejected request, got {other:?}"),
    }
}

#[tokio::test]
async fn test_review_queue_filters_by_status() {
    let env = TestEnv::new();
    let root_ctx = env.context(Some(&TestEnv::bootstrap_principal())).await;
    let service = env.service();

    let a = principal("a@agency.test");
    let b = principal("b@agency.test");
    let first = service
        .submit(&env.context(Some(&a)).await, request_for(Role::Author))
        .await
        .unwrap();
    service
        .submit(&env.context(Some(&b)).await, request_for(Role::Author))
        .await
        .unwrap();
    service.reject(&root_ctx, first.id).await.unwrap();

    let pending = service
        .list_requests(&root_ctx, Some(RequestStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].user_id, b.id);

    let all = service.list_requests(&root_ctx, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let author = env.member("author@agency.test", Role::Author, None).await;
    let err = service
        .list_requests(&env.context(Some(&author)).await, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AccessError::PermissionDenied(PolicyViolation::NotReviewer)
    ));
}
