//! authgate API - credential and token lifecycle service
//!
//! Provides HTTP endpoints for signup, login, token refresh and user
//! lookup, with bearer-token authentication on protected routes.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use crate::state::{AppState, StartupError};
use authgate_core::{AppConfig, InMemoryUserStore};
use axum::{routing::get, Json, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document for the service
#[derive(OpenApi)]
#[openapi(
    info(title = "authgate API", description = "Credential and token lifecycle service"),
    paths(
        handlers::health::health_check,
        handlers::auth::signup_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::api_1,
        handlers::users::api_2,
    ),
    components(schemas(
        auth::SignupRequest,
        auth::LoginRequest,
        auth::RefreshRequest,
        auth::AuthResponse,
        auth::UserInfo,
        auth::UsersPage,
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::users::AccessGranted,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Signup, login and token refresh"),
        (name = "users", description = "User lookup"),
        (name = "protected", description = "Sample protected endpoints"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Build the full application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::api_routes(state.clone()))
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Signing secret used by [`testing_config`]
#[doc(hidden)]
pub const TEST_JWT_SECRET: &str = "authgate-test-secret";

/// Valid configuration with cheap Argon2 parameters, for tests
#[doc(hidden)]
pub fn testing_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = Some(TEST_JWT_SECRET.to_string());
    config.auth.memory_cost = 1024;
    config.auth.time_cost = 1;
    config.store.timeout_secs = 5;
    config
}

/// Router over an empty in-memory store, for tests
#[doc(hidden)]
pub fn create_router_for_testing() -> Result<Router, StartupError> {
    let state = AppState::new(testing_config(), Arc::new(InMemoryUserStore::new()))?;
    Ok(create_router(Arc::new(state)))
}
