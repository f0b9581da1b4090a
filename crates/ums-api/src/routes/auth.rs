//! Authorization extractors

use axum::{extract::FromRequestParts, http::request::Parts};
use ums_auth::CurrentUser;

use crate::error::ApiError;

/// Role allowed to modify roles and users
pub const ADMIN_ROLE: &str = "ADMIN";

/// Extractor for a signed-in user holding the `ADMIN` role
pub struct RequireAdmin(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        user.require_role(ADMIN_ROLE)?;
        Ok(RequireAdmin(user))
    }
}
