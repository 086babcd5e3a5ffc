//! Integration tests for the permission endpoints and route gating.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{Actor, TestApp};

#[tokio::test]
async fn test_grant_list_check_revoke() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let bob = Actor::member("bob");

    let response = app.grant(&admin, &bob, "document", "42", "edit").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["permission_level"], "edit");
    let permission_id = response.data()["id"].as_str().expect("id").to_string();

    let response = app
        .request("GET", "/api/permissions/entity/document/42", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data().as_array().map(Vec::len), Some(1));

    let response = app
        .request("GET", &format!("/api/permissions/user/{}", bob.id), None, Some(&bob))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()[0]["entity_id"], "42");

    let response = app
        .request(
            "GET",
            "/api/permissions/check?entity_type=document&entity_id=42&level=view",
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["allowed"], true);

    let response = app
        .request(
            "GET",
            "/api/permissions/check?entity_type=document&entity_id=42&level=delete",
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(response.data()["allowed"], false);

    let response = app
        .request(
            "DELETE",
            &format!("/api/permissions/{permission_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request(
            "DELETE",
            &format!("/api/permissions/{permission_id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_regrant_overwrites_single_row() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let bob = Actor::member("bob");

    app.grant(&admin, &bob, "document", "7", "admin").await;
    let response = app.grant(&admin, &bob, "document", "7", "view").await;
    assert_eq!(response.data()["permission_level"], "view");

    let response = app
        .request("GET", "/api/permissions/entity/document/7", None, Some(&admin))
        .await;
    assert_eq!(response.data().as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_only_entity_admins_grant_and_list() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let bob = Actor::member("bob");
    let carol = Actor::member("carol");

    let response = app.grant(&bob, &carol, "document", "1", "view").await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    app.grant(&admin, &bob, "document", "1", "admin").await;
    let response = app.grant(&bob, &carol, "document", "1", "view").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", "/api/permissions/entity/document/1", None, Some(&carol))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    let response = app
        .request(
            "GET",
            &format!("/api/permissions/user/{}", bob.id),
            None,
            Some(&carol),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bad_grants_are_validation_errors() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let bob = Actor::member("bob");

    let response = app.grant(&admin, &bob, "document", "1", "viewer").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");

    let response = app.grant(&admin, &bob, "", "1", "view").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            "POST",
            "/api/permissions",
            Some(json!({
                "user_id": bob.id,
                "entity_type": "document",
                "entity_id": "1",
                "level": "view",
                "expires_at": "2000-01-01T00:00:00Z",
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_type_wide_admin_manages_lifecycle() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let operator = Actor::member("operator");
    app.install_pages("1.0.0", &admin).await;

    let response = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&operator))
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    app.grant(&admin, &operator, "extension", "*", "admin").await;
    let response = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&operator))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["extension"]["status"], "active");

    let response = app
        .install(&helpers::pages_package("2.0.0"), false, &operator)
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_extension_routes_are_gated_by_view() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let bob = Actor::member("bob");
    let id = app.install_pages("1.0.0", &admin).await;
    app.request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin))
        .await;

    let response = app.request("GET", "/extensions/pages", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.request("GET", "/extensions/pages", None, Some(&bob)).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    app.grant(&admin, &bob, "extension", &id.to_string(), "view")
        .await;
    let response = app.request("GET", "/extensions/pages", None, Some(&bob)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_ungated_routes_skip_the_check() {
    let app = TestApp::with_config(|config| config.gate_routes = false);
    let admin = Actor::admin("admin1");
    app.install_pages("1.0.0", &admin).await;
    app.request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin))
        .await;

    let response = app.request("GET", "/extensions/pages", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_principal_is_unauthenticated() {
    let app = TestApp::new();
    let mut ghost = Actor::member("ghost");
    ghost.roles = Some("wizard".to_string());

    let response = app.request("GET", "/api/extensions", None, Some(&ghost)).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
