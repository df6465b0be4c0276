//! User lookup handlers
//!
//! Protected routes. The auth middleware has already attached the
//! principal; these handlers only apply the authorization rule.

use crate::audit::ClientInfo;
use crate::auth::{AuthenticatedUser, ListUsersQuery};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    response::IntoResponse,
    Extension, Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// List all users (admin only)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "One page of users", body = crate::auth::UsersPage),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let page = state.auth.list_users(&user, &query, &client).await?;

    Ok(Json(page))
}

/// Get one user
///
/// Admins may read any record; other users only their own.
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User record", body = crate::auth::UserInfo),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Not the caller's record", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let info = state.auth.get_user(&user, &user_id, &client).await?;

    Ok(Json(info))
}

/// Response of the sample protected endpoints
#[derive(Debug, Serialize, ToSchema)]
pub struct AccessGranted {
    pub success: String,
}

/// Sample protected endpoint
#[utoipa::path(
    get,
    path = "/api-1",
    tag = "protected",
    responses(
        (status = 200, description = "Access granted", body = AccessGranted),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn api_1(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    tracing::debug!(user_id = %user.user_id, "api-1 accessed");
    Json(AccessGranted {
        success: "Access granted for api-1".to_string(),
    })
}

/// Sample protected endpoint
#[utoipa::path(
    get,
    path = "/api-2",
    tag = "protected",
    responses(
        (status = 200, description = "Access granted", body = AccessGranted),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn api_2(Extension(user): Extension<AuthenticatedUser>) -> impl IntoResponse {
    tracing::debug!(user_id = %user.user_id, "api-2 accessed");
    Json(AccessGranted {
        success: "Access granted for api-2".to_string(),
    })
}
