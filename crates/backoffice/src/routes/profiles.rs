//! Profile listing for admins.

use axum::{Json, extract::State};
use tracing::instrument;

use agency_core::Profile;

use crate::error::AppError;
use crate::middleware::CurrentAccess;
use crate::services::AccessRequestService;
use crate::state::AppState;

/// All profiles, newest first.
///
/// GET /api/profiles
///
/// # Errors
///
/// Returns 403 unless the caller is an admin.
#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    CurrentAccess(ctx): CurrentAccess,
) -> Result<Json<Vec<Profile>>, AppError> {
    let profiles = AccessRequestService::new(state.store())
        .list_profiles(&ctx)
        .await?;
    Ok(Json(profiles))
}
