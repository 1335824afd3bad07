use std::borrow::Cow;

use validator::ValidationError;

use crate::error::{AppError, Result};
use crate::response::FieldError;

/// Work factor for every stored hash.
pub const BCRYPT_COST: u32 = 12;

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

const TOO_LONG_MESSAGE: &str = "password must be at most 72 bytes";

/// Validator hook for password fields.
pub fn validate_password_bytes(password: &str) -> std::result::Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut error = ValidationError::new("password_too_long");
        error.message = Some(Cow::Borrowed(TOO_LONG_MESSAGE));
        return Err(error);
    }
    Ok(())
}

/// Refuses input bcrypt would silently truncate.
pub fn hash_password(password: &str) -> Result<String> {
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AppError::Validation(vec![FieldError {
            field: "password".to_string(),
            message: TOO_LONG_MESSAGE.to_string(),
        }]));
    }
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

/// Returns false for a mismatch, an over-long password, or a digest that
/// cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> bool {
    if password.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    bcrypt::verify(password, hash).unwrap_or(false)
}

pub async fn hash_password_async(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password)).await?
}

pub async fn verify_password_async(password: String, hash: String) -> Result<bool> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?)
}
