/// Integration tests for registration, verification, login and password reset
///
/// Runs the full router over in-memory stores; no external services needed.

mod common;

use axum::http::{Method, StatusCode};
use common::{TestContext, PASSWORD};
use serde_json::json;

fn wrong_code(real: &str) -> &'static str {
    if real == "000000" {
        "111111"
    } else {
        "000000"
    }
}

#[tokio::test]
async fn test_register_verify_and_login() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .json(
            Method::POST,
            "/v1/auth/register",
            None,
            json!({ "email": "ana@example.com", "password": PASSWORD, "name": "Ana" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user"]["verified"], false);
    assert_eq!(body["user"]["role"], "user");
    let token = body["token"].as_str().unwrap().to_string();

    // Unverified accounts cannot log in yet
    let (status, _) = ctx
        .json(
            Method::POST,
            "/v1/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let code = ctx.mailer.last_code_for("ana@example.com").await.unwrap();
    assert_eq!(code.len(), 6);

    for _ in 0..2 {
        let (status, body) = ctx
            .json(
                Method::PUT,
                "/v1/auth/verify-email",
                Some(&token),
                json!({ "code": wrong_code(&code) }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "invalid verification code");
    }

    let (status, body) = ctx
        .json(
            Method::PUT,
            "/v1/auth/verify-email",
            Some(&token),
            json!({ "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verified"], true);

    let (status, _) = ctx
        .json(
            Method::POST,
            "/v1/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = ctx
        .json(
            Method::POST,
            "/v1/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().unwrap().len() > 20);
    assert_eq!(body["user"]["email"], "ana@example.com");
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let ctx = TestContext::new();
    ctx.register("dup@example.com").await;

    let (status, body) = ctx
        .json(
            Method::POST,
            "/v1/auth/register",
            None,
            json!({ "email": "dup@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn test_three_wrong_codes_exhaust_attempts() {
    let ctx = TestContext::new();
    let token = ctx.register("eve@example.com").await;
    let code = ctx.mailer.last_code_for("eve@example.com").await.unwrap();

    for _ in 0..3 {
        let (status, _) = ctx
            .json(
                Method::PUT,
                "/v1/auth/verify-email",
                Some(&token),
                json!({ "code": wrong_code(&code) }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = ctx
        .json(
            Method::PUT,
            "/v1/auth/verify-email",
            Some(&token),
            json!({ "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "no attempts left");

    // A fresh code restores the attempts
    let (status, _) = ctx
        .json(Method::POST, "/v1/auth/verify-email/resend", Some(&token), json!({}))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let fresh = ctx.mailer.last_code_for("eve@example.com").await.unwrap();
    let (status, _) = ctx
        .json(
            Method::PUT,
            "/v1/auth/verify-email",
            Some(&token),
            json!({ "code": fresh }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let ctx = TestContext::new();
    ctx.verified_user("bob@example.com").await;

    let (status, _) = ctx
        .json(
            Method::POST,
            "/v1/auth/password/forgot",
            None,
            json!({ "email": "nobody@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .json(
            Method::POST,
            "/v1/auth/password/forgot",
            None,
            json!({ "email": "bob@example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let code = ctx.mailer.last_code_for("bob@example.com").await.unwrap();
    let (status, body) = ctx
        .json(
            Method::POST,
            "/v1/auth/password/verify",
            None,
            json!({ "email": "bob@example.com", "code": code }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let reset_token = body["token"].as_str().unwrap().to_string();

    // The reset token only opens the password endpoint
    let (status, _) = ctx.get("/v1/users/me", &reset_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .json(Method::PATCH, "/v1/auth/password", Some(&reset_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .json(
            Method::PATCH,
            "/v1/auth/password",
            Some(&reset_token),
            json!({ "password": "a-brand-new-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx
        .json(
            Method::POST,
            "/v1/auth/login",
            None,
            json!({ "email": "bob@example.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = ctx
        .json(
            Method::POST,
            "/v1/auth/login",
            None,
            json!({ "email": "bob@example.com", "password": "a-brand-new-secret" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_payload_lists_fields() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .json(
            Method::POST,
            "/v1/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "short" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);
}

#[tokio::test]
async fn test_missing_or_bad_token_is_unauthorized() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .json(Method::GET, "/v1/clients", None, json!(null))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = ctx.get("/v1/clients", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let ctx = TestContext::new();

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = ctx.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "memory");
}
