use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::middleware::request_context::expose_internal_errors;
use crate::response::{ApiResponse, FieldError};
use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(Vec<FieldError>),

    #[error("Invalid request body")]
    InvalidBody(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    #[error("No refresh token provided")]
    MissingRefreshToken,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Invalid or expired reset token")]
    InvalidResetToken,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("User already exists")]
    UserExists,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upload(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidBody(_)
            | AppError::BadRequest(_)
            | AppError::InvalidResetToken
            | AppError::IncorrectPassword
            | AppError::Upload(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::Unauthorized(_)
            | AppError::MissingRefreshToken
            | AppError::InvalidRefreshToken
            | AppError::RefreshTokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UserExists | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidBody(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::MissingRefreshToken => "NO_REFRESH_TOKEN",
            AppError::InvalidRefreshToken | AppError::RefreshTokenExpired => {
                "INVALID_REFRESH_TOKEN"
            }
            AppError::InvalidResetToken => "INVALID_TOKEN",
            AppError::IncorrectPassword => "INVALID_PASSWORD",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::UserExists => "USER_EXISTS",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Upload(_) => "UPLOAD_ERROR",
            AppError::RateLimited(_) => "RATE_LIMIT_EXCEEDED",
            AppError::Database(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_internal(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let message = if self.is_internal() {
            tracing::error!(error = %self, "Request failed with internal error");
            if expose_internal_errors() {
                self.to_string()
            } else {
                "Internal server error".to_string()
            }
        } else {
            self.to_string()
        };

        if let AppError::InvalidBody(reason) = &self {
            tracing::debug!(%reason, "Rejected request body");
        }

        let details = match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        };

        (status, ApiResponse::failure(code, message, details)).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        for (field, kind) in errors.errors() {
            if let ValidationErrorsKind::Field(list) = kind {
                let name = camel_case(field);
                for error in list {
                    fields.push(FieldError {
                        field: name.clone(),
                        message: describe_field_error(&name, error),
                    });
                }
            }
        }
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AppError::Validation(fields)
    }
}

/// Request bodies are camelCase on the wire, so field details are too.
fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn describe_field_error(field: &str, error: &validator::ValidationError) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }

    match &*error.code {
        "required" => format!("{field} is required"),
        "email" => format!("{field} must be a valid email address"),
        "length" => {
            let min = error.params.get("min").and_then(|v| v.as_u64());
            let max = error.params.get("max").and_then(|v| v.as_u64());
            match (min, max) {
                (Some(min), Some(max)) => {
                    format!("{field} must be between {min} and {max} characters")
                }
                (Some(min), None) => format!("{field} must be at least {min} characters"),
                (None, Some(max)) => format!("{field} must be at most {max} characters"),
                (None, None) => format!("{field} has an invalid length"),
            }
        }
        _ => format!("{field} is invalid"),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("File not found: {key}")),
            StorageError::InvalidKey(key) => AppError::BadRequest(format!("Invalid file key: {key}")),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("Password hashing failed: {err}"))
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 8, max = 72))]
        password: String,
    }

    #[test]
    fn field_names_are_camel_cased() {
        assert_eq!(camel_case("new_password"), "newPassword");
        assert_eq!(camel_case("email"), "email");
    }

    #[test]
    fn refresh_failures_share_one_code() {
        assert_eq!(AppError::InvalidRefreshToken.code(), "INVALID_REFRESH_TOKEN");
        assert_eq!(AppError::RefreshTokenExpired.code(), "INVALID_REFRESH_TOKEN");
        assert_eq!(AppError::RefreshTokenExpired.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::UserExists.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::InvalidResetToken.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::IncorrectPassword.code(), "INVALID_PASSWORD");
        assert_eq!(
            AppError::RateLimited("slow down".into()).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            AppError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_become_field_details() {
        let input = Signup {
            email: "nope".to_string(),
            password: "short".to_string(),
        };
        let err: AppError = input.validate().unwrap_err().into();

        let AppError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "email");
        assert_eq!(fields[0].message, "email must be a valid email address");
        assert_eq!(fields[1].field, "password");
        assert_eq!(
            fields[1].message,
            "password must be between 8 and 72 characters"
        );
    }
}
