//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, health, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Public and protected routes
///
/// Protected routes only run after the auth middleware has attached an
/// [`AuthenticatedUser`](crate::auth::AuthenticatedUser).
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/users/signup", post(auth::signup_handler))
        .route("/users/login", post(auth::login_handler))
        .route("/users/refresh", post(auth::refresh_handler));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/users", get(users::list_users))
        .route("/users/:user_id", get(users::get_user))
        .route("/api-1", get(users::api_1))
        .route("/api-2", get(users::api_2))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
