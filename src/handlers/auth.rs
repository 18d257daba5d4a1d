use crate::domain::{Profile, Role};
use crate::error::{AppError, AppResult};
use crate::handlers::profile::ProfileResponse;
use crate::middleware::AuthUser;
use crate::response::ApiResponse;
use crate::services::auth::{AuthService, SignedIn};
use crate::services::profile::ProfileService;
use crate::state::AppState;
use crate::utils::cookie::{
    build_auth_cookie, build_clear_cookie, extract_cookie, ACCESS_TOKEN_COOKIE,
    REFRESH_TOKEN_COOKIE,
};
use anyhow::anyhow;
use axum::{
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        Ok(())
    } else {
        Err(ValidationError::new("username_charset"))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email)]
    pub email: String,
    /// Password (min 8 characters)
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    /// Public display name (3-50 characters: letters, digits, `_`, `-`)
    #[validate(length(min = 3, max = 50), custom(function = "validate_username"))]
    pub username: String,
    /// HELPER (default) or AUTHORITY
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshTokenRequest {
    /// Refresh token; falls back to the `refresh_token` cookie
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    /// New bio; empty or null clears it
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    /// JWT access token
    pub token: String,
    /// JWT refresh token
    pub refresh_token: String,
    pub profile: ProfileResponse,
}

impl From<SignedIn> for AuthResponse {
    fn from(signed_in: SignedIn) -> Self {
        Self {
            token: signed_in.tokens.access_token,
            refresh_token: signed_in.tokens.refresh_token,
            profile: ProfileResponse::from(signed_in.profile),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account registered", body = AuthResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 403, description = "Role not open for sign-up", body = AppError),
        (status = 409, description = "Username or email already exists", body = AppError),
    ),
    tag = "auth"
)]
pub async fn register(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(format!("Validation error: {e}")))?;

    let signed_in = AuthService::new(&state)
        .register(
            &payload.email,
            &payload.password,
            &payload.username,
            payload.role.unwrap_or(Role::Helper),
        )
        .await?;

    signed_in_response(&state, signed_in, "Registration successful.")
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = AppError),
    ),
    tag = "auth"
)]
pub async fn login(
    Extension(state): Extension<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let signed_in = AuthService::new(&state)
        .login(&payload.email, &payload.password)
        .await?;

    signed_in_response(&state, signed_in, "Login successful.")
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Session rotated", body = AuthResponse),
        (status = 401, description = "Invalid or expired refresh token", body = AppError),
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    payload: Option<Json<RefreshTokenRequest>>,
) -> AppResult<impl IntoResponse> {
    let refresh_token = payload
        .and_then(|Json(body)| body.refresh_token)
        .or_else(|| extract_cookie(&headers, REFRESH_TOKEN_COOKIE))
        .ok_or(AppError::Unauthorized)?;

    let signed_in = AuthService::new(&state).refresh(&refresh_token).await?;
    signed_in_response(&state, signed_in, "Session refreshed.")
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Logout successful", body = String),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn logout(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    AuthService::new(&state).logout(&auth_user.session).await?;

    let mut response = ApiResponse::ok("Logout successful").into_response();
    append_set_cookie(
        &mut response,
        &build_clear_cookie(&state.cookies, ACCESS_TOKEN_COOKIE),
    )?;
    append_set_cookie(
        &mut response,
        &build_clear_cookie(&state.cookies, REFRESH_TOKEN_COOKIE),
    )?;
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    security(("jwt_token" = [])),
    responses(
        (status = 200, description = "Current profile with progression", body = ProfileResponse),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
) -> AppResult<impl IntoResponse> {
    let profile = current_profile(&state, &auth_user).await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

#[utoipa::path(
    put,
    path = "/api/v1/auth/profile",
    security(("jwt_token" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileResponse),
        (status = 400, description = "Validation error", body = AppError),
        (status = 401, description = "Unauthorized", body = AppError),
    ),
    tag = "auth"
)]
pub async fn update_profile(
    Extension(state): Extension<AppState>,
    auth_user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<impl IntoResponse> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let profile = ProfileService::new(&state)
        .update_bio(auth_user.user_id, payload.bio)
        .await?;
    Ok(ApiResponse::ok(ProfileResponse::from(profile)))
}

pub(crate) async fn current_profile(state: &AppState, auth_user: &AuthUser) -> AppResult<Profile> {
    match ProfileService::new(state).get(auth_user.user_id).await {
        Err(AppError::NotFound) => Err(AppError::Unauthorized),
        other => other,
    }
}

fn signed_in_response(state: &AppState, signed_in: SignedIn, message: &str) -> AppResult<Response> {
    let access_cookie = build_auth_cookie(
        &state.cookies,
        ACCESS_TOKEN_COOKIE,
        &signed_in.tokens.access_token,
        state.tokens.access_ttl(),
    );
    let refresh_cookie = build_auth_cookie(
        &state.cookies,
        REFRESH_TOKEN_COOKIE,
        &signed_in.tokens.refresh_token,
        state.tokens.refresh_ttl(),
    );

    let mut response =
        ApiResponse::with_message(AuthResponse::from(signed_in), message).into_response();
    append_set_cookie(&mut response, &access_cookie)?;
    append_set_cookie(&mut response, &refresh_cookie)?;
    Ok(response)
}

fn append_set_cookie(response: &mut Response, cookie_value: &str) -> AppResult<()> {
    let value = HeaderValue::from_str(cookie_value).map_err(|e| {
        AppError::Internal(anyhow!("Failed to build Set-Cookie header value: {}", e))
    })?;
    response.headers_mut().append(header::SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_charset() {
        assert!(validate_username("eco_hana-2").is_ok());
        assert!(validate_username("hana!").is_err());
        assert!(validate_username("ha na").is_err());
    }

    #[test]
    fn register_request_validation() {
        let request = RegisterRequest {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            username: "ab".to_string(),
            role: None,
        };
        let errors = request.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("username"));
    }
}
