//! Common test utilities for integration tests
//!
//! Builds the full router over in-memory stores, a recording mailer and an
//! in-memory artifact store, and provides request helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use docket_api::app::{build_router, AppState, Collaborators};
use docket_api::config::{
    ApiConfig, ArtifactsConfig, Config, DatabaseConfig, HashingConfig, JwtConfig, MailConfig,
};
use docket_shared::artifacts::MemoryArtifactStore;
use docket_shared::messaging::MemoryMailer;
use docket_shared::render::PdfRenderer;
use docket_shared::store::Stores;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::Service as _;

pub const PASSWORD: &str = "correct-horse-battery";

const BOUNDARY: &str = "docket-test-boundary";

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: "integration-test-secret-at-least-32-bytes".to_string(),
            access_ttl_secs: 3600,
            reset_ttl_secs: 600,
        },
        hashing: HashingConfig {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        },
        artifacts: ArtifactsConfig {
            pinata_jwt: None,
            gateway_url: None,
            api_url: "http://unused".to_string(),
        },
        mail: MailConfig {
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            from: "Docket <no-reply@docket.local>".to_string(),
        },
        frontend_url: "http://localhost:3000".to_string(),
    }
}

/// Test context holding the router and its observable collaborators
pub struct TestContext {
    pub app: Router,
    pub mailer: Arc<MemoryMailer>,
    pub artifacts: Arc<MemoryArtifactStore>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_artifacts(MemoryArtifactStore::new())
    }

    pub fn with_artifacts(artifacts: MemoryArtifactStore) -> Self {
        let mailer = Arc::new(MemoryMailer::new());
        let artifacts = Arc::new(artifacts);

        let state = AppState::new(
            test_config(),
            Stores::memory(),
            None,
            Collaborators {
                mailer: mailer.clone(),
                artifacts: artifacts.clone(),
                renderer: Arc::new(PdfRenderer::new()),
            },
        );

        Self {
            app: build_router(state),
            mailer,
            artifacts,
        }
    }

    /// Sends a request and returns the status and the body parsed as JSON
    ///
    /// Empty bodies come back as `Value::Null`.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
        };

        (status, value)
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Sends one file as a multipart form field
    pub async fn upload(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        field: &str,
        filename: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Registers an account and returns its access token
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/v1/auth/register",
                None,
                json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers and verifies an account, returning its access token
    pub async fn verified_user(&self, email: &str) -> String {
        let token = self.register(email).await;
        let code = self.mailer.last_code_for(email).await.unwrap();

        let (status, body) = self
            .json(
                Method::PUT,
                "/v1/auth/verify-email",
                Some(&token),
                json!({ "code": code }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "verify failed: {body}");

        token
    }

    /// Creates a client and a project for it, returning their ids
    pub async fn client_and_project(&self, token: &str) -> (String, String) {
        let (status, client) = self
            .json(
                Method::POST,
                "/v1/clients",
                Some(token),
                json!({ "name": "Acme", "cif": "B12345678" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "client failed: {client}");
        let client_id = client["id"].as_str().unwrap().to_string();

        let (status, project) = self
            .json(
                Method::POST,
                "/v1/projects",
                Some(token),
                json!({
                    "clientId": client_id,
                    "name": "Warehouse",
                    "projectCode": "WH-01",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "project failed: {project}");

        (client_id, project["id"].as_str().unwrap().to_string())
    }
}
