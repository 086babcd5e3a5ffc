//! Page route handlers.

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::store::{Page, PageStore};

/// Create-page request body.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePageRequest {
    /// URL slug: lowercase letters, digits and `-`.
    #[validate(length(min = 1, max = 100), custom(function = "validate_slug"))]
    pub slug: String,
    /// Title.
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub body: String,
}

fn validate_slug(slug: &str) -> Result<(), validator::ValidationError> {
    if slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        Ok(())
    } else {
        Err(validator::ValidationError::new("slug"))
    }
}

/// Builds the page router over a store.
pub fn router(store: PageStore) -> Router {
    Router::new()
        .route("/", get(list_pages).post(create_page))
        .route("/{slug}", get(get_page))
        .with_state(store)
}

/// GET /
async fn list_pages(State(store): State<PageStore>) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": store.list().await }))
}

/// POST /
async fn create_page(
    State(store): State<PageStore>,
    Json(req): Json<CreatePageRequest>,
) -> Response {
    if let Err(e) = req.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "VALIDATION", "message": e.to_string() })),
        )
            .into_response();
    }

    let page = Page {
        slug: req.slug,
        title: req.title,
        body: req.body,
        updated_at: Utc::now(),
    };
    let created = store.put(page.clone()).await;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    (status, Json(json!({ "success": true, "data": page }))).into_response()
}

/// GET /{slug}
async fn get_page(State(store): State<PageStore>, Path(slug): Path<String>) -> Response {
    match store.get(&slug).await {
        Some(page) => Json(json!({ "success": true, "data": page })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "NOT_FOUND", "message": format!("Page '{slug}' not found") })),
        )
            .into_response(),
    }
}
