use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
};
use validator::Validate;

use super::auth_dto::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RefreshResponse, RegisterRequest,
    UpdateProfileRequest,
};
use super::auth_service::AuthSession;
use super::cookie::{clear_refresh_cookie, read_cookie, refresh_cookie, REFRESH_TOKEN_COOKIE};
use crate::{
    error::{AppError, Result},
    extract::AppJson,
    middleware::{AuthUser, CurrentUser},
    response::{ApiResponse, MessageResponse},
    state::AppState,
    user::UserResponse,
};

fn session_response(state: &AppState, status: StatusCode, session: AuthSession) -> Response {
    let cookie = refresh_cookie(&state.config, &session.refresh_token);
    let body = AuthResponse {
        user: session.user.into(),
        access_token: session.access_token,
        expires_in: state.auth_service.access_token_ttl(),
    };

    (status, AppendHeaders([(SET_COOKIE, cookie)]), ApiResponse::success(body)).into_response()
}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered, refresh token set as cookie", body = AuthResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Registration is disabled"),
        (status = 409, description = "User already exists"),
        (status = 429, description = "Too many registration attempts")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<Response> {
    payload.validate()?;

    if !state.settings_service.flag("allow_registration", true).await? {
        return Err(AppError::Forbidden("Registration is disabled".to_string()));
    }

    let session = state.auth_service.register(payload).await?;
    Ok(session_response(&state, StatusCode::CREATED, session))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, refresh token set as cookie", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Response> {
    payload.validate()?;

    let session = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(session_response(&state, StatusCode::OK, session))
}

/// Exchange the refresh token cookie for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Missing, invalid or expired refresh token")
    )
)]
pub async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let token =
        read_cookie(&headers, REFRESH_TOKEN_COOKIE).ok_or(AppError::MissingRefreshToken)?;

    match state.auth_service.refresh_access_token(&token).await {
        Ok(access_token) => Ok(ApiResponse::success(RefreshResponse {
            access_token,
            expires_in: state.auth_service.access_token_ttl(),
        })
        .into_response()),
        Err(err @ (AppError::InvalidRefreshToken | AppError::RefreshTokenExpired)) => Ok((
            AppendHeaders([(SET_COOKIE, clear_refresh_cookie(&state.config))]),
            err,
        )
            .into_response()),
        Err(err) => Err(err),
    }
}

/// Revoke the refresh token cookie and clear it
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = read_cookie(&headers, REFRESH_TOKEN_COOKIE) {
        state.auth_service.revoke_refresh_token(&token).await?;
    }

    Ok((
        AppendHeaders([(SET_COOKIE, clear_refresh_cookie(&state.config))]),
        ApiResponse::success(MessageResponse::new("Logged out successfully")),
    )
        .into_response())
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Result<impl IntoResponse> {
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// Update the authenticated user's profile
#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "auth",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state
        .auth_service
        .update_profile(user_id, payload.name)
        .await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// Change the authenticated user's password
#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    tag = "auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Validation error or wrong current password"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    state.auth_service.change_password(user_id, payload).await?;
    Ok(ApiResponse::success(MessageResponse::new(
        "Password changed successfully",
    )))
}
