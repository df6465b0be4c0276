//! Authentication API handlers
//!
//! Signup, login and token refresh. All three are public routes.

use crate::audit::ClientInfo;
use crate::auth::{LoginRequest, RefreshRequest, SignupRequest};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Register a new user account
///
/// Creates the user and returns its first access/refresh pair.
///
/// # Responses
///
/// * `201 Created` - User registered, tokens issued
/// * `400 Bad Request` - Invalid input
/// * `409 Conflict` - Email or phone number already registered
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/users/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered successfully", body = crate::auth::AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email or phone number already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let client = ClientInfo::from_headers(&headers);
    let response = state.auth.signup(request, &client).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// Issues a fresh token pair and replaces the stored one.
///
/// # Responses
///
/// * `200 OK` - Authentication successful, returns tokens
/// * `401 Unauthorized` - Invalid credentials
/// * `500 Internal Server Error` - Server error
#[utoipa::path(
    post,
    path = "/users/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = crate::auth::AuthResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let client = ClientInfo::from_headers(&headers);
    let response = state.auth.login(request, &client).await?;

    Ok(Json(response))
}

/// Refresh the token pair
///
/// The presented refresh token must be the one currently stored for the
/// user. Both tokens are replaced.
#[utoipa::path(
    post,
    path = "/users/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = crate::auth::AuthResponse),
        (status = 400, description = "Malformed request body", body = crate::error::ApiError),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let client = ClientInfo::from_headers(&headers);
    let response = state.auth.refresh(request, &client).await?;

    Ok(Json(response))
}
