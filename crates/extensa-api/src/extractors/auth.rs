//! `AuthPrincipal` extractor: resolves the calling principal and rejects
//! anonymous requests.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use extensa_core::AppError;
use extensa_entity::user::Principal;

use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated principal available in handlers.
#[derive(Debug, Clone)]
pub struct AuthPrincipal(pub Principal);

impl AuthPrincipal {
    /// Returns the inner principal.
    pub fn principal(&self) -> &Principal {
        &self.0
    }
}

impl std::ops::Deref for AuthPrincipal {
    type Target = Principal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let principal = state
            .resolver
            .resolve(&parts.headers)
            .await?
            .ok_or_else(|| AppError::unauthenticated("Request carries no principal"))?;
        Ok(AuthPrincipal(principal))
    }
}
