//! Principal resolution from request headers.
//!
//! Credentials are verified upstream by an authenticating proxy, which
//! forwards the principal's id, name and roles in headers.

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::debug;

use extensa_core::AppError;
use extensa_core::config::AuthConfig;
use extensa_core::result::AppResult;
use extensa_core::types::UserId;
use extensa_entity::user::{Principal, UserRole};

/// Resolves the authenticated principal of a request.
#[async_trait]
pub trait PrincipalResolver: Send + Sync + std::fmt::Debug {
    /// Returns the principal, `None` if the request carries none, or an
    /// error if it carries a malformed one.
    async fn resolve(&self, headers: &HeaderMap) -> AppResult<Option<Principal>>;
}

/// Trusts principal headers set by an upstream proxy.
#[derive(Debug, Clone)]
pub struct HeaderPrincipalResolver {
    config: AuthConfig,
}

impl HeaderPrincipalResolver {
    /// Creates a resolver from the auth configuration.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

#[async_trait]
impl PrincipalResolver for HeaderPrincipalResolver {
    async fn resolve(&self, headers: &HeaderMap) -> AppResult<Option<Principal>> {
        if !self.config.trust_principal_headers {
            return Ok(None);
        }
        let Some(raw_id) = Self::header(headers, &self.config.id_header) else {
            return Ok(None);
        };

        let user_id: UserId = raw_id.parse().map_err(|_| {
            AppError::unauthenticated(format!("Malformed principal id '{raw_id}'"))
        })?;
        let username = Self::header(headers, &self.config.name_header)
            .map(str::to_string)
            .unwrap_or_else(|| user_id.to_string());

        let roles = match Self::header(headers, &self.config.roles_header) {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(|r| {
                    r.parse::<UserRole>().map_err(|_| {
                        AppError::unauthenticated(format!("Unknown principal role '{r}'"))
                    })
                })
                .collect::<AppResult<Vec<_>>>()?,
            None => vec![UserRole::Member],
        };

        debug!(user_id = %user_id, username = %username, "Principal resolved from headers");
        Ok(Some(Principal::new(user_id, username, roles)))
    }
}
