use axum::{extract::State, response::IntoResponse};
use validator::Validate;

use super::auth_dto::{
    ForgotPasswordRequest, ResetPasswordRequest, ValidateResetTokenRequest,
    ValidateResetTokenResponse,
};
use crate::{
    error::Result,
    extract::AppJson,
    response::{ApiResponse, MessageResponse},
    state::AppState,
};

/// Request a password reset email
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "auth",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Same response whether or not the email is registered", body = MessageResponse),
        (status = 400, description = "Validation error")
    )
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ForgotPasswordRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    state
        .password_reset_service
        .request_reset(&payload.email)
        .await?;

    Ok(ApiResponse::success(MessageResponse::new(
        "If an account with that email exists, a password reset link has been sent.",
    )))
}

/// Check a reset token before showing the new-password form
#[utoipa::path(
    post,
    path = "/api/auth/validate-reset-token",
    tag = "auth",
    request_body = ValidateResetTokenRequest,
    responses(
        (status = 200, description = "Token is valid", body = ValidateResetTokenResponse),
        (status = 400, description = "Invalid or expired reset token")
    )
)]
pub async fn validate_reset_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ValidateResetTokenRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state
        .password_reset_service
        .validate_token(&payload.token)
        .await?;

    Ok(ApiResponse::success(ValidateResetTokenResponse {
        valid: true,
        email: user.email,
    }))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "auth",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Validation error or invalid reset token")
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(payload): AppJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    state
        .password_reset_service
        .reset_password(&payload.token, &payload.new_password)
        .await?;

    Ok(ApiResponse::success(MessageResponse::new(
        "Password has been reset successfully. Please login with your new password.",
    )))
}
