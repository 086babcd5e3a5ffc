//! Runtime route table for extension routers.
//!
//! The host router is built once at startup, so extension routes cannot be
//! merged into it. Instead every request under `/extensions` is forwarded to
//! this table, which maps mount prefixes to the routers extensions
//! contributed and can change while the server runs.

use std::collections::BTreeMap;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tokio::sync::RwLock;
use tower::ServiceExt;
use tracing::{debug, info};

use extensa_core::AppError;
use extensa_core::result::AppResult;
use extensa_core::types::ExtensionId;

#[derive(Debug, Clone)]
struct Mount {
    owner: ExtensionId,
    router: Router,
}

/// A resolved mount for one request path.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The mount prefix that matched.
    pub prefix: String,
    /// Extension owning the mount.
    pub owner: ExtensionId,
    router: Router,
}

impl RouteMatch {
    /// Forwards a request to the mounted router with the prefix stripped.
    pub async fn call(self, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();
        let rest = parts
            .uri
            .path()
            .strip_prefix(self.prefix.as_str())
            .unwrap_or("");
        let path = if rest.is_empty() { "/" } else { rest };
        let path_and_query = match parts.uri.query() {
            Some(query) => format!("{path}?{query}"),
            None => path.to_string(),
        };

        parts.uri = match Uri::builder().path_and_query(path_and_query).build() {
            Ok(uri) => uri,
            Err(e) => {
                debug!(error = %e, "Rejected extension request URI");
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        match self.router.oneshot(Request::from_parts(parts, body)).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        }
    }
}

/// Prefix-keyed table of mounted extension routers.
#[derive(Debug, Default)]
pub struct RouteTable {
    mounts: RwLock<BTreeMap<String, Mount>>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `router` at `prefix` on behalf of `owner`.
    ///
    /// Fails with `CONFLICT` if the prefix is already mounted, or if it
    /// nests inside (or around) a prefix owned by another extension.
    pub async fn mount(&self, owner: ExtensionId, prefix: &str, router: Router) -> AppResult<()> {
        let prefix = normalize(prefix);
        let mut mounts = self.mounts.write().await;

        if let Some(existing) = mounts.get(&prefix) {
            return Err(AppError::conflict(format!(
                "Route prefix '{prefix}' is already mounted by extension {}",
                existing.owner
            )));
        }
        if let Some((other, mount)) = mounts
            .iter()
            .find(|(other, mount)| mount.owner != owner && overlaps(other, &prefix))
        {
            return Err(AppError::conflict(format!(
                "Route prefix '{prefix}' overlaps '{other}' mounted by extension {}",
                mount.owner
            )));
        }

        mounts.insert(prefix.clone(), Mount { owner, router });
        info!(extension_id = %owner, prefix = %prefix, "Route group mounted");
        Ok(())
    }

    /// Removes every mount owned by `owner` and returns their prefixes.
    pub async fn unmount_owner(&self, owner: ExtensionId) -> Vec<String> {
        let mut mounts = self.mounts.write().await;
        let prefixes: Vec<String> = mounts
            .iter()
            .filter(|(_, mount)| mount.owner == owner)
            .map(|(prefix, _)| prefix.clone())
            .collect();
        for prefix in &prefixes {
            mounts.remove(prefix);
        }
        if !prefixes.is_empty() {
            info!(extension_id = %owner, count = prefixes.len(), "Extension routes unmounted");
        }
        prefixes
    }

    /// Returns the number of mounted groups.
    pub async fn len(&self) -> usize {
        self.mounts.read().await.len()
    }

    /// Returns whether nothing is mounted.
    pub async fn is_empty(&self) -> bool {
        self.mounts.read().await.is_empty()
    }

    /// Finds the longest mounted prefix covering `path`.
    pub async fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let mounts = self.mounts.read().await;
        mounts
            .iter()
            .filter(|(prefix, _)| covers(prefix, path))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, mount)| RouteMatch {
                prefix: prefix.clone(),
                owner: mount.owner,
                router: mount.router.clone(),
            })
    }

    /// Dispatches a request to the owning router, or answers 404.
    pub async fn dispatch(&self, request: Request<Body>) -> Response {
        match self.resolve(request.uri().path()).await {
            Some(matched) => matched.call(request).await,
            None => {
                debug!(path = %request.uri().path(), "No extension route mounted");
                StatusCode::NOT_FOUND.into_response()
            }
        }
    }
}

fn normalize(prefix: &str) -> String {
    format!("/{}", prefix.trim_matches('/'))
}

/// Whether `prefix` covers `path` on a segment boundary.
fn covers(prefix: &str, path: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

fn overlaps(a: &str, b: &str) -> bool {
    covers(a, b) || covers(b, a)
}
