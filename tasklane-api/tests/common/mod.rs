//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory snapshot backend, so every test
//! gets an isolated store and can inspect what would have been persisted.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tasklane_api::app::{build_router, AppState};
use tasklane_api::config::Config;
use tasklane_shared::auth::admin::AdminDirectory;
use tasklane_shared::store::backend::MemoryBackend;
use tasklane_shared::store::Store;
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "adminpass";
pub const PASSWORD: &str = "secret1";

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Store,
    pub backend: Arc<MemoryBackend>,
    pub config: Config,
}

/// Configuration as the server would load it, minus the process environment
pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some(JWT_SECRET.to_string()),
        "ADMIN_ACCOUNTS" => Some(format!("{}:{}", ADMIN_USERNAME, ADMIN_PASSWORD)),
        _ => None,
    })
    .expect("test config")
}

impl TestContext {
    /// Creates a new test context with an empty store
    pub async fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let store = Store::open(backend.clone()).await;
        let config = test_config();

        let admins = AdminDirectory::from_credentials(
            config
                .auth
                .admin_accounts
                .iter()
                .map(|admin| (admin.username.clone(), admin.secret.as_str())),
        )
        .expect("admin directory");

        let app = build_router(AppState::new(store.clone(), admins, config.clone()));

        TestContext {
            app,
            store,
            backend,
            config,
        }
    }

    /// Sends a request and returns the status and the JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!(
                    "non-JSON body for {}: {}",
                    status,
                    String::from_utf8_lossy(&bytes)
                )
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers `username` with email `<username>@example.com`
    pub async fn register(&self, username: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["userId"].as_i64().unwrap()
    }

    pub async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .post(
                "/api/auth/login",
                None,
                serde_json::json!({
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in, returning the user id and token
    pub async fn user(&self, username: &str) -> (i64, String) {
        let id = self.register(username).await;
        (id, self.login(username).await)
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .post(
                "/api/auth/admin-login",
                None,
                serde_json::json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a task and returns its JSON
    pub async fn create_task(&self, token: &str, body: Value) -> Value {
        let (status, task) = self.post("/api/tasks", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", task);
        task
    }
}
