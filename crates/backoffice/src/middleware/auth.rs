//! Bearer token authentication.
//!
//! Tokens are issued by the hosted auth provider and signed with a shared
//! HS256 secret. A request without an `Authorization` header is anonymous; a
//! request with a header that does not verify is rejected.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use agency_core::{Email, PrincipalId};

use crate::config::AuthConfig;
use crate::error::{AppError, set_sentry_user};
use crate::models::{AccessContext, Principal};
use crate::services::IdentityResolver;
use crate::state::AppState;

/// Claims the back-office reads from an auth provider token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<UserMetadata>,
}

/// Free-form account metadata. Only the display name is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

/// Reasons a bearer token is refused.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("authorization header is not a bearer token")]
    NotBearer,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token email is invalid: {0}")]
    InvalidEmail(#[from] agency_core::EmailError),
}

/// Verifies auth provider tokens.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("key", &"[REDACTED]")
            .field("audience", &self.validation.aud)
            .finish()
    }
}

impl TokenVerifier {
    /// Build a verifier for HS256 tokens carrying `config.audience`.
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);

        Self {
            key: DecodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
            validation,
        }
    }

    /// Verify `token` and extract the principal it vouches for.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the signature, expiry or audience do not check
    /// out, or if the email claim is not an address.
    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let claims = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)?.claims;

        Ok(Principal {
            id: PrincipalId::new(claims.sub),
            email: Email::parse(&claims.email)?,
            full_name: claims
                .user_metadata
                .and_then(|m| m.full_name)
                .filter(|name| !name.trim().is_empty()),
        })
    }

    /// Extract and verify the bearer token in `headers`, if any.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if a header is present but does not verify.
    pub fn principal_from_headers(
        &self,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, TokenError> {
        let Some(value) = headers.get(header::AUTHORIZATION) else {
            return Ok(None);
        };
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::NotBearer)?;

        self.verify(token).map(Some)
    }
}

/// Extractor that resolves the caller's [`AccessContext`].
///
/// Anonymous callers get an empty context; services decide what they may do.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentAccess(ctx): CurrentAccess) -> impl IntoResponse {
///     Json(ctx.capabilities().any())
/// }
/// ```
pub struct CurrentAccess(pub AccessContext);

impl FromRequestParts<AppState> for CurrentAccess {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = state
            .verifier()
            .principal_from_headers(&parts.headers)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AppError::Unauthorized(e.to_string())
            })?;

        if let Some(principal) = &principal {
            set_sentry_user(&principal.id.to_string(), Some(principal.email.as_str()));
        }

        let ctx = IdentityResolver::new(state.store(), state.bootstrap_email())
            .resolve(principal)
            .await;

        Ok(Self(ctx))
    }
}
