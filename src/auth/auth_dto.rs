use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::user::UserResponse;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(
        length(min = 8, max = 128),
        custom(function = "crate::auth::password::validate_password_bytes")
    )]
    pub password: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub access_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "currentPassword is required"))]
    pub current_password: String,
    #[validate(
        length(min = 8, max = 128),
        custom(function = "crate::auth::password::validate_password_bytes")
    )]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ValidateResetTokenRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateResetTokenResponse {
    pub valid: bool,
    pub email: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    #[validate(
        length(min = 8, max = 128),
        custom(function = "crate::auth::password::validate_password_bytes")
    )]
    pub new_password: String,
}
