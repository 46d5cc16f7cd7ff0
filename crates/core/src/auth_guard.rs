use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::jwt::{decode_access_token, KeyRing};
use crate::types::Principal;

/// Implemented by each service's `AppState` so the `Principal` extractor
/// below can reach the shared JWT keyring without every service
/// hand-rolling its own auth middleware.
pub trait HasKeyRing {
    fn key_ring(&self) -> &KeyRing;
}

/// Axum extractor: pulls `Authorization: Bearer <token>`, verifies it
/// against the service's keyring, and yields the decoded `Principal`.
///
/// Every downstream service validates tokens itself (the gateway only
/// forwards them, per spec.md §4.1), so this extractor is what every
/// service's handlers actually depend on.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
    S: HasKeyRing,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Auth("missing authorization header".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("authorization header must be a bearer token".into()))?;

        let claims = decode_access_token(state.key_ring(), token)?;
        Ok(claims.into())
    }
}

/// Helper used by handlers that accept a `user_id` parameter alongside the
/// bearer identity (the open question from spec.md §9): non-admin callers
/// must match the resource's owner.
pub fn require_same_user(principal: &Principal, subject_user_id: &str) -> Result<(), AppError> {
    principal
        .authorize_user_scope(subject_user_id)
        .map_err(AppError::Permission)
}
