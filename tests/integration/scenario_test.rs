//! End-to-end scenario: install, enable, grant, check, disable, re-enable.

mod helpers;

use axum::http::StatusCode;

use helpers::{Actor, TestApp};

async fn access(app: &TestApp, actor: &Actor, level: &str) -> bool {
    let response = app
        .request(
            "GET",
            &format!("/api/extensions/by-name/Pages/access?level={level}"),
            None,
            Some(actor),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    response.data()["allowed"].as_bool().expect("allowed flag")
}

#[tokio::test]
async fn test_disable_revokes_effective_access_and_reenable_restores_it() {
    let app = TestApp::new();
    let admin1 = Actor::admin("admin1");
    let bob = Actor::member("bob");

    // Install: installed, disabled.
    let id = app.install_pages("1.0.0", &admin1).await;
    let response = app
        .request("GET", "/api/extensions/Pages_1.0.0", None, Some(&admin1))
        .await;
    assert_eq!(response.data()["status"], "installed");
    assert_eq!(response.data()["is_enabled"], false);

    // Enable: active, enabled, prefix resolves.
    let response = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin1))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["extension"]["status"], "active");
    assert_eq!(response.data()["extension"]["is_enabled"], true);
    let response = app
        .request("GET", "/extensions/pages", None, Some(&admin1))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    // Grant bob VIEW on the extension.
    let response = app
        .grant(&admin1, &bob, "extension", &id.to_string(), "view")
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert!(!access(&app, &bob, "edit").await);
    assert!(access(&app, &bob, "view").await);

    // Disable: access gone, prefix gone, grant kept.
    let response = app
        .request("POST", "/api/extensions/Pages_1.0.0/disable", None, Some(&admin1))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    assert!(!access(&app, &bob, "view").await);
    let response = app
        .request("GET", "/extensions/pages", None, Some(&admin1))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .request(
            "GET",
            &format!("/api/permissions/user/{}", bob.id),
            None,
            Some(&bob),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let rows = response.data().as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["entity_type"], "extension");
    assert_eq!(rows[0]["entity_id"], id.to_string());
    assert_eq!(rows[0]["permission_level"], "view");

    // Re-enable: the untouched grant is effective again.
    let response = app
        .request("POST", "/api/extensions/Pages_1.0.0/enable", None, Some(&admin1))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.data()["extension"]["status"], "active");
    assert!(access(&app, &bob, "view").await);
    assert!(!access(&app, &bob, "edit").await);
    let response = app
        .request("GET", "/extensions/pages", None, Some(&admin1))
        .await;
    assert_eq!(response.status, StatusCode::OK);
}
