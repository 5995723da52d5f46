//! Access request handlers.
//!
//! Permission checks live in [`AccessRequestService`]; handlers only translate
//! between HTTP and the service.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use agency_core::{AdminRequest, AdminRequestId, Profile, RequestStatus, Role};

use crate::error::AppError;
use crate::middleware::CurrentAccess;
use crate::routes::extract::{JsonBody, PathParam, QueryParams};
use crate::services::{AccessRequestService, RequestLookup, SubmitAccessRequest};
use crate::state::AppState;

/// Query parameters for the review queue.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<RequestStatus>,
}

/// Body of an approval.
#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub role: Role,
}

/// Result of an approval.
#[derive(Debug, Serialize)]
pub struct ApproveResponse {
    pub request: AdminRequest,
    pub profile: Profile,
}

/// The caller's latest request.
///
/// GET /api/access-requests/mine
#[instrument(skip_all)]
pub async fn mine(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
) -> Json<RequestLookup> {
    Json(AccessRequestService::new(state.store()).own_request(&ctx).await)
}

/// File an access request.
///
/// POST /api/access-requests
///
/// # Errors
///
/// Returns 401 without a principal and 409 if the caller already has access or
/// a pending request.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
    JsonBody(input): JsonBody<SubmitAccessRequest>,
) -> Result<(StatusCode, Json<AdminRequest>), AppError> {
    let request = AccessRequestService::new(state.store())
        .submit(&ctx, input)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Review queue, newest first.
///
/// GET /api/access-requests?status=pending
///
/// # Errors
///
/// Returns 403 unless the caller can review.
#[instrument(skip_all, fields(status = ?query.status))]
pub async fn index(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
    QueryParams(query): QueryParams<ListQuery>,
) -> Result<Json<Vec<AdminRequest>>, AppError> {
    let requests = AccessRequestService::new(state.store())
        .list_requests(&ctx, query.status)
        .await?;
    Ok(Json(requests))
}

/// Approve a pending request.
///
/// POST /api/access-requests/{id}/approve
///
/// # Errors
///
/// Returns 403 if the caller may not grant the role, 404 for an unknown request
/// and 409 if it was already reviewed.
#[instrument(skip_all, fields(request_id = %id, role = %body.role))]
pub async fn approve(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
    PathParam(id): PathParam<AdminRequestId>,
    JsonBody(body): JsonBody<ApproveBody>,
) -> Result<Json<ApproveResponse>, AppError> {
    let (request, profile) = AccessRequestService::new(state.store())
        .approve(&ctx, id, body.role)
        .await?;
    Ok(Json(ApproveResponse { request, profile }))
}

/// Reject a pending request.
///
/// POST /api/access-requests/{id}/reject
///
/// # Errors
///
/// Same as [`approve`], minus the role check.
#[instrument(skip_all, fields(request_id = %id))]
pub async fn reject(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
    PathParam(id): PathParam<AdminRequestId>,
) -> Result<Json<AdminRequest>, AppError> {
    let request = AccessRequestService::new(state.store())
        .reject(&ctx, id)
        .await?;
    Ok(Json(request))
}
