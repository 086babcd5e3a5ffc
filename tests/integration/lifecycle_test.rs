//! Integration tests for the extension lifecycle over HTTP.

mod helpers;

use axum::http::StatusCode;
use serde_json::json;

use helpers::{Actor, TestApp};

#[tokio::test]
async fn test_health_reports_memory_stores() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["database"], "memory");
    assert_eq!(response.data()["live_extensions"], 0);
}

#[tokio::test]
async fn test_install_requires_principal_and_global_admin() {
    let app = TestApp::new();
    let archive = helpers::pages_package("1.0.0");

    let response = app
        .request("GET", "/api/extensions", None, None)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code(), "UNAUTHENTICATED");

    let bob = Actor::member("bob");
    let response = app.install(&archive, false, &bob).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.error_code(), "FORBIDDEN");

    let admin = Actor::admin("admin1");
    let response = app.request("GET", "/api/extensions", None, Some(&admin)).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data().as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_enable_mounts_pages_routes_and_disable_removes_them() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let id = app.install_pages("1.0.0", &admin).await;

    let response = app
        .request("GET", &format!("/api/extensions/{id}"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["status"], "installed");
    assert_eq!(response.data()["is_enabled"], false);
    assert_eq!(response.data()["mount_base"], "/extensions/pages");

    let response = app
        .request("GET", "/extensions/pages", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["changed"], true);
    assert_eq!(response.data()["extension"]["status"], "active");
    assert!(app.migrator.is_applied("Pages", "pages_001_page_table").await);

    let response = app
        .request(
            "POST",
            "/extensions/pages",
            Some(json!({ "slug": "about", "title": "About", "body": "Hello" })),
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = app
        .request("GET", "/extensions/pages/about", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["title"], "About");

    let response = app
        .request("POST", &format!("/api/extensions/{id}/disable"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["extension"]["is_enabled"], false);

    let response = app
        .request("GET", "/extensions/pages/about", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert!(app.coordinator.routes().is_empty().await);
}

#[tokio::test]
async fn test_repeated_transitions_are_no_ops() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    app.install_pages("1.0.0", &admin).await;

    let first = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin))
        .await;
    let second = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin))
        .await;
    assert_eq!(first.data()["changed"], true);
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.data()["changed"], false);
    assert_eq!(app.coordinator.routes().len().await, 1);

    app.request("POST", "/api/extensions/Pages_1.0.0/disable", None, Some(&admin))
        .await;
    let again = app
        .request("POST", "/api/extensions/Pages_1.0.0/disable", None, Some(&admin))
        .await;
    assert_eq!(again.status, StatusCode::OK);
    assert_eq!(again.data()["changed"], false);
}

#[tokio::test]
async fn test_reinstall_conflicts_and_overwrite_keeps_id() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let id = app.install_pages("1.0.0", &admin).await;
    let archive = helpers::pages_package("1.0.0");

    let response = app.install(&archive, false, &admin).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "CONFLICT");

    app.request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin))
        .await;
    let response = app.install(&archive, true, &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["extension"]["id"], id);
    assert_eq!(response.data()["extension"]["is_enabled"], false);
    assert!(!app.coordinator.is_live(id.into()).await);
}

#[tokio::test]
async fn test_invalid_packages_are_rejected() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");

    let response = app.install(b"not a tarball", false, &admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_PACKAGE");

    let response = app
        .install(&helpers::unresolvable_package(), false, &admin)
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.error_code(), "LOAD_ERROR");

    let response = app.request("GET", "/api/extensions", None, Some(&admin)).await;
    assert_eq!(response.data().as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_oversized_package_is_rejected() {
    let app = TestApp::with_config(|config| config.max_package_bytes = 16);
    let admin = Actor::admin("admin1");

    let response = app
        .install(&helpers::pages_package("1.0.0"), false, &admin)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "INVALID_PACKAGE");
}

#[tokio::test]
async fn test_unknown_extension_is_not_found() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");

    let response = app
        .request("POST", "/api/extensions/Nope_1.0.0/enable", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request("GET", "/api/extensions/not-a-ref", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code(), "VALIDATION");
}

#[tokio::test]
async fn test_uninstall_refuses_orphaning_grants_unless_cascading() {
    let app = TestApp::new();
    let admin = Actor::admin("admin1");
    let bob = Actor::member("bob");
    let id = app.install_pages("1.0.0", &admin).await;

    let response = app
        .grant(&admin, &bob, "extension", &id.to_string(), "view")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("DELETE", "/api/extensions/Pages_1.0.0", None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .request(
            "DELETE",
            "/api/extensions/Pages_1.0.0?cascade=true",
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app
        .request("GET", &format!("/api/extensions/{id}"), None, Some(&admin))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(
            "GET",
            &format!("/api/permissions/entity/extension/{id}"),
            None,
            Some(&admin),
        )
        .await;
    assert_eq!(response.data().as_array().map(Vec::len), Some(0));
    assert!(!app.root().join("Pages_1.0.0").exists());
}
