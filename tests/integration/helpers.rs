//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use extensa_api::{AppState, HeaderPrincipalResolver, build_app};
use extensa_auth::{MemoryAuditSink, PermissionEngine};
use extensa_core::config::{AuthConfig, ExtensionConfig, ServerConfig};
use extensa_database::memory::{MemoryExtensionStore, MemoryPermissionStore, MemorySchemaMigrator};
use extensa_plugin::{BuiltinModules, ExtensionLoader, LifecycleCoordinator, PackageBuilder};

const BOUNDARY: &str = "extensa-test-boundary";

/// A principal as the upstream proxy would present it
#[derive(Debug, Clone)]
pub struct Actor {
    /// Principal id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Comma-separated roles, `None` for the default role
    pub roles: Option<String>,
}

impl Actor {
    /// A global admin
    pub fn admin(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roles: Some("admin".to_string()),
        }
    }

    /// A principal with no special role
    pub fn member(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roles: None,
        }
    }
}

/// Test response with parsed body
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body, `Null` when empty or not JSON
    pub body: Value,
}

impl TestResponse {
    /// The `data` member of a success envelope
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// The stable error code of an error body
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// Test application context over in-memory stores
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The coordinator behind the router
    pub coordinator: Arc<LifecycleCoordinator>,
    /// Extension registry rows
    pub extensions: MemoryExtensionStore,
    /// Permission rows
    pub permissions: MemoryPermissionStore,
    /// Schema migrations applied by extensions
    pub migrator: MemorySchemaMigrator,
    /// Recorded audit events
    pub audit: MemoryAuditSink,
    /// Extension root, removed on drop
    root: TempDir,
}

impl TestApp {
    /// Create a new test application with default settings
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a new test application, adjusting the extension settings
    pub fn with_config(adjust: impl FnOnce(&mut ExtensionConfig)) -> Self {
        let root = tempfile::tempdir().expect("Failed to create extension root");
        let mut config = ExtensionConfig::with_root(root.path());
        config.operation_timeout_seconds = 10;
        adjust(&mut config);

        let extensions = MemoryExtensionStore::new();
        let permissions = MemoryPermissionStore::new();
        let migrator = MemorySchemaMigrator::new();
        let audit = MemoryAuditSink::new();

        let engine = Arc::new(PermissionEngine::new(
            Arc::new(permissions.clone()),
            Arc::new(extensions.clone()),
            Arc::new(audit.clone()),
        ));

        let mut builtins = BuiltinModules::new();
        extension_pages::register(&mut builtins);
        let loader = ExtensionLoader::new(builtins, Arc::new(migrator.clone()));

        let coordinator = Arc::new(LifecycleCoordinator::new(
            config,
            Arc::new(extensions.clone()),
            engine,
            loader,
            Arc::new(audit.clone()),
        ));

        let resolver = Arc::new(HeaderPrincipalResolver::new(AuthConfig::default()));
        let state = AppState::new(Arc::clone(&coordinator), resolver, None);
        let router = build_app(state, &ServerConfig::default());

        Self {
            router,
            coordinator,
            extensions,
            permissions,
            migrator,
            audit,
            root,
        }
    }

    /// Path of the extension root directory
    pub fn root(&self) -> &std::path::Path {
        self.root.path()
    }

    /// Make a JSON request
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        actor: Option<&Actor>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(actor) = actor {
            builder = with_principal(builder, actor);
        }

        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).expect("Failed to encode body"))
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).expect("Failed to build request"))
            .await
    }

    /// Upload a package archive through the install endpoint
    pub async fn install(&self, archive: &[u8], overwrite: bool, actor: &Actor) -> TestResponse {
        let mut payload = Vec::new();
        payload.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"package\"; filename=\"package.tar.gz\"\r\nContent-Type: application/gzip\r\n\r\n"
            )
            .as_bytes(),
        );
        payload.extend_from_slice(archive);
        payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = with_principal(
            Request::builder()
                .method("POST")
                .uri(format!("/api/extensions?overwrite={overwrite}"))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                ),
            actor,
        )
        .body(Body::from(payload))
        .expect("Failed to build request");

        self.send(request).await
    }

    /// Install the sample Pages package and return its extension id
    pub async fn install_pages(&self, version: &str, actor: &Actor) -> i64 {
        let archive = pages_package(version);
        let response = self.install(&archive, false, actor).await;
        assert_eq!(response.status, StatusCode::OK, "install failed: {:?}", response.body);
        response.data()["extension"]["id"]
            .as_i64()
            .expect("extension id")
    }

    /// Grant a permission through the API
    pub async fn grant(
        &self,
        grantor: &Actor,
        user: &Actor,
        entity_type: &str,
        entity_id: &str,
        level: &str,
    ) -> TestResponse {
        self.request(
            "POST",
            "/api/permissions",
            Some(serde_json::json!({
                "user_id": user.id,
                "entity_type": entity_type,
                "entity_id": entity_id,
                "level": level,
            })),
            Some(grantor),
        )
        .await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

fn with_principal(
    builder: axum::http::request::Builder,
    actor: &Actor,
) -> axum::http::request::Builder {
    let builder = builder
        .header("x-principal-id", actor.id.to_string())
        .header("x-principal-name", actor.name.as_str());
    match &actor.roles {
        Some(roles) => builder.header("x-principal-roles", roles.as_str()),
        None => builder,
    }
}

/// The sample Pages package archive
pub fn pages_package(version: &str) -> Vec<u8> {
    extension_pages::sample_package(version)
        .build()
        .expect("Failed to build package")
}

/// A package whose route entrypoint no module provides
pub fn unresolvable_package() -> Vec<u8> {
    PackageBuilder::new()
        .manifest(
            "name = \"Ghost\"\nversion = \"0.1.0\"\ntype = \"generic\"\n\n[routes]\nentrypoint = \"ghost\"\n",
        )
        .build()
        .expect("Failed to build package")
}
