//! Authentication API handlers
//!
//! Registration, password login, token refresh and logout. None of these
//! require an access token.
//!
//! Author: hephaex@gmail.com

use crate::audit::ClientInfo;
use crate::auth::{EmployeeCreate, RefreshRequest, TokenPair};
use crate::error::AppError;
use crate::extract::{ApiForm, ApiJson};
use crate::handlers::employees::EmployeeOut;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use leave_core::Role;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// OAuth2 password-grant style login form
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    /// Account email
    pub username: String,
    pub password: String,
}

/// Logout response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Register a new employee account
///
/// Self-registration always creates an `employee`; any `role` in the body
/// is ignored.
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `400 Bad Request` - Invalid input or email already exists
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = EmployeeCreate,
    responses(
        (status = 201, description = "Account registered", body = EmployeeOut),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<EmployeeCreate>,
) -> Result<impl IntoResponse, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let account = state
        .sessions
        .register(request, Role::Employee, &client)
        .await?;

    Ok((StatusCode::CREATED, Json(EmployeeOut::from(account))))
}

/// Login with email and password
///
/// Takes a form body (`username`, `password`). Any failure is the same
/// 401 "Invalid Credentials".
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "auth",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<TokenPair>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let pair = state
        .sessions
        .login(&form.username, &form.password, &client)
        .await?;

    Ok(Json(pair))
}

/// Exchange a refresh token for a new token pair
///
/// The presented refresh token is revoked; the response carries its
/// replacement.
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = TokenPair),
        (status = 401, description = "Invalid or expired refresh token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    let pair = state
        .sessions
        .refresh(&request.refresh_token, &client)
        .await?;

    Ok(Json(pair))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "auth",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
        (status = 401, description = "Invalid refresh token", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<LogoutResponse>, AppError> {
    let client = ClientInfo::from_headers(&headers);
    state
        .sessions
        .logout(&request.refresh_token, &client)
        .await?;

    Ok(Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_form_ignores_extra_oauth_fields() {
        let form: LoginForm = serde_json::from_value(serde_json::json!({
            "grant_type": "password",
            "username": "a@b.com",
            "password": "p",
            "scope": "",
        }))
        .unwrap();
        assert_eq!(form.username, "a@b.com");
        assert_eq!(form.password, "p");
    }

    #[test]
    fn test_logout_response_serialization() {
        let response = LogoutResponse {
            message: "Logged out successfully".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"message":"Logged out successfully"}"#);
    }
}
