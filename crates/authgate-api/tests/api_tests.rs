//! API Integration Tests
//!
//! Every test drives the full router (middleware included) over an
//! in-memory store via `tower::ServiceExt::oneshot`.

use authgate_api::auth::{IdentityClaims, JwtConfig, TokenIssuer};
use authgate_api::{create_router, create_router_for_testing, state::AppState, testing_config};
use authgate_api::TEST_JWT_SECRET;
use authgate_core::{InMemoryUserStore, UserRole};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };

    (status, json)
}

fn signup_body(email: &str, phone: &str, user_type: &str) -> Value {
    json!({
        "first_name": "Ada",
        "last_name": "Lovelace",
        "password": "s3cret!",
        "email": email,
        "phone": phone,
        "user_type": user_type,
    })
}

async fn signup(app: &Router, email: &str, phone: &str, user_type: &str) -> Value {
    let (status, json) = send(
        app,
        create_json_request("POST", "/users/signup", Some(signup_body(email, phone, user_type))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "signup failed: {json}");
    json
}

async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/users/login",
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

fn enforcing_router() -> Router {
    let mut config = testing_config();
    config.auth.enforce_current_token = true;
    let state = AppState::new(config, Arc::new(InMemoryUserStore::new())).unwrap();
    create_router(Arc::new(state))
}

fn token_for(secret: &str, user_id: &str, issued_at: chrono::DateTime<Utc>) -> String {
    let identity = IdentityClaims {
        user_id: user_id.to_string(),
        email: "ada@example.com".to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        role: UserRole::User,
    };
    TokenIssuer::new(&JwtConfig::new(secret))
        .issue_at(&identity, issued_at)
        .unwrap()
        .access_token
}

// =============================================================================
// Health and OpenAPI
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing().unwrap();

    let (status, json) = send(&app, create_json_request("GET", "/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document_available() {
    let app = create_router_for_testing().unwrap();

    let (status, json) = send(&app, create_json_request("GET", "/api-docs/openapi.json", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["openapi"].is_string());
    assert!(json["paths"]["/users/signup"].is_object());
    assert!(json["paths"]["/users/{user_id}"].is_object());
    assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());

    let response_schema = |path: &str, method: &str, status: &str| {
        json["paths"][path][method]["responses"][status]["content"]["application/json"]["schema"]
            ["$ref"]
            .clone()
    };
    assert_eq!(
        response_schema("/users/signup", "post", "201"),
        "#/components/schemas/AuthResponse"
    );
    assert_eq!(
        response_schema("/users", "get", "200"),
        "#/components/schemas/UsersPage"
    );
    assert_eq!(
        response_schema("/users/{user_id}", "get", "200"),
        "#/components/schemas/UserInfo"
    );
}

// =============================================================================
// Signup
// =============================================================================

#[tokio::test]
async fn test_signup_returns_tokens_without_secrets() {
    let app = create_router_for_testing().unwrap();

    let json = signup(&app, "ada@example.com", "555-0100", "USER").await;

    assert!(json["access_token"].is_string());
    assert!(json["refresh_token"].is_string());
    assert_eq!(json["token_type"], "Bearer");
    assert_eq!(json["expires_in"], 86400);
    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["role"], "USER");
    assert!(json["user"].get("password_hash").is_none());
    assert!(json["user"].get("token").is_none());
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = create_router_for_testing().unwrap();
    signup(&app, "ada@example.com", "555-0100", "USER").await;

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/users/signup",
            Some(signup_body("ada@example.com", "555-0199", "USER")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
    assert!(json.get("access_token").is_none());
}

#[tokio::test]
async fn test_signup_validation_errors() {
    let app = create_router_for_testing().unwrap();

    for body in [
        signup_body("not-an-email", "555-0100", "USER"),
        signup_body("ada@example.com", "555-0100", "SUPERUSER"),
    ] {
        let (status, json) =
            send(&app, create_json_request("POST", "/users/signup", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let app = create_router_for_testing().unwrap();

    let mut missing_field = signup_body("ada@example.com", "555-0100", "USER");
    missing_field.as_object_mut().unwrap().remove("user_type");
    let (status, json) = send(
        &app,
        create_json_request("POST", "/users/signup", Some(missing_field)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/users/login")
        .body(Body::from(r#"{"email":"ada@example.com","password":"s3cret!"}"#))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");

    let request = Request::builder()
        .method("POST")
        .uri("/users/refresh")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, json) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
}

// =============================================================================
// Login and refresh
// =============================================================================

#[tokio::test]
async fn test_login_success() {
    let app = create_router_for_testing().unwrap();
    signup(&app, "ada@example.com", "555-0100", "USER").await;

    let (status, json) = login(&app, "ada@example.com", "s3cret!").await;

    assert_eq!(status, StatusCode::OK);
    let token = json["access_token"].as_str().unwrap();
    let (status, _) = send(&app, get_with_token("/api-1", token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_password_leaves_current_token() {
    let app = enforcing_router();
    let created = signup(&app, "ada@example.com", "555-0100", "USER").await;
    let token = created["access_token"].as_str().unwrap();

    let (wrong_status, wrong_json) = login(&app, "ada@example.com", "not-it").await;
    let (unknown_status, unknown_json) = login(&app, "bob@example.com", "s3cret!").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_json["message"], unknown_json["message"]);

    // The stored pair is untouched, so the signup token is still current.
    let (status, _) = send(&app, get_with_token("/api-1", token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_newer_login_supersedes_token_when_enforced() {
    let app = enforcing_router();
    let created = signup(&app, "ada@example.com", "555-0100", "USER").await;
    let old_token = created["access_token"].as_str().unwrap();

    let (_, fresh) = login(&app, "ada@example.com", "s3cret!").await;
    let new_token = fresh["access_token"].as_str().unwrap();

    let (status, json) = send(&app, get_with_token("/api-2", old_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "TOKEN_SUPERSEDED");

    let (status, _) = send(&app, get_with_token("/api-2", new_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_older_token_still_valid_without_enforcement() {
    let app = create_router_for_testing().unwrap();
    let created = signup(&app, "ada@example.com", "555-0100", "USER").await;
    let old_token = created["access_token"].as_str().unwrap();

    login(&app, "ada@example.com", "s3cret!").await;

    let (status, _) = send(&app, get_with_token("/api-1", old_token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_rotates_pair() {
    let app = create_router_for_testing().unwrap();
    let created = signup(&app, "ada@example.com", "555-0100", "USER").await;
    let refresh_token = created["refresh_token"].as_str().unwrap();

    let request = |token: &str| {
        create_json_request(
            "POST",
            "/users/refresh",
            Some(json!({ "refresh_token": token })),
        )
    };

    let (status, json) = send(&app, request(refresh_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(json["refresh_token"].as_str().unwrap(), refresh_token);

    let (status, _) = send(&app, request(refresh_token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Authentication middleware
// =============================================================================

#[tokio::test]
async fn test_protected_route_requires_token() {
    let app = create_router_for_testing().unwrap();

    for uri in ["/api-1", "/api-2", "/users", "/users/u1"] {
        let (status, json) = send(&app, create_json_request("GET", uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "uri: {uri}");
        assert_eq!(json["code"], "MISSING_CREDENTIALS");
    }
}

#[tokio::test]
async fn test_rejection_reasons() {
    let app = create_router_for_testing().unwrap();

    let expired = token_for(TEST_JWT_SECRET, "u1", Utc::now() - Duration::days(2));
    let forged = token_for("some-other-secret", "u1", Utc::now());

    let cases = [
        (expired.as_str(), "TOKEN_EXPIRED"),
        (forged.as_str(), "TOKEN_BAD_SIGNATURE"),
        ("not.a.token", "TOKEN_MALFORMED"),
    ];
    for (token, code) in cases {
        let (status, json) = send(&app, get_with_token("/api-1", token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["code"], code);
    }
}

#[tokio::test]
async fn test_refresh_token_is_not_an_access_token() {
    let app = create_router_for_testing().unwrap();
    let created = signup(&app, "ada@example.com", "555-0100", "USER").await;

    let (status, json) = send(
        &app,
        get_with_token("/api-1", created["refresh_token"].as_str().unwrap()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "TOKEN_WRONG_TYPE");
}

// =============================================================================
// Authorization
// =============================================================================

#[tokio::test]
async fn test_user_cannot_read_other_user() {
    let app = create_router_for_testing().unwrap();
    let ada = signup(&app, "ada@example.com", "555-0100", "USER").await;
    let bob = signup(&app, "bob@example.com", "555-0101", "USER").await;

    let ada_token = ada["access_token"].as_str().unwrap();
    let ada_id = ada["user"]["user_id"].as_str().unwrap();
    let bob_id = bob["user"]["user_id"].as_str().unwrap();

    let (status, json) = send(&app, get_with_token(&format!("/users/{bob_id}"), ada_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");

    let (status, json) = send(&app, get_with_token(&format!("/users/{ada_id}"), ada_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["email"], "ada@example.com");
}

#[tokio::test]
async fn test_admin_reads_and_lists_users() {
    let app = create_router_for_testing().unwrap();
    let admin = signup(&app, "root@example.com", "555-0000", "ADMIN").await;
    let ada = signup(&app, "ada@example.com", "555-0100", "USER").await;
    signup(&app, "bob@example.com", "555-0101", "USER").await;

    let admin_token = admin["access_token"].as_str().unwrap();
    let ada_id = ada["user"]["user_id"].as_str().unwrap();

    let (status, json) = send(&app, get_with_token(&format!("/users/{ada_id}"), admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], ada_id);

    let (status, json) = send(&app, get_with_token("/users", admin_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 3);
    assert_eq!(json["user_items"].as_array().unwrap().len(), 3);

    let (status, json) = send(
        &app,
        get_with_token("/users?recordPerPage=2&page=2", admin_token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_count"], 3);
    assert_eq!(json["user_items"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, get_with_token("/users/nobody", admin_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unparseable_pagination_falls_back_to_defaults() {
    let app = create_router_for_testing().unwrap();
    let admin = signup(&app, "root@example.com", "555-0000", "ADMIN").await;
    signup(&app, "ada@example.com", "555-0100", "USER").await;
    let admin_token = admin["access_token"].as_str().unwrap();

    for uri in [
        "/users?recordPerPage=abc",
        "/users?recordPerPage=&page=",
        "/users?recordPerPage=1.5&page=first",
    ] {
        let (status, json) = send(&app, get_with_token(uri, admin_token)).await;
        assert_eq!(status, StatusCode::OK, "{uri}: {json}");
        assert_eq!(json["total_count"], 2);
        assert_eq!(json["user_items"].as_array().unwrap().len(), 2);
    }
}

#[tokio::test]
async fn test_user_cannot_list_users() {
    let app = create_router_for_testing().unwrap();
    let ada = signup(&app, "ada@example.com", "555-0100", "USER").await;

    let (status, _) = send(&app, get_with_token("/users", ada["access_token"].as_str().unwrap())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
