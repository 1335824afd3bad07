use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Signs an HS256 access token valid for `expires_in` seconds.
pub fn create_jwt(user_id: Uuid, email: &str, secret: &str, expires_in: i64) -> Result<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::seconds(expires_in))
        .ok_or_else(|| AppError::Internal("Token expiry out of range".to_string()))?;

    let claims = Claims {
        user_id,
        email: email.to_string(),
        iat: now.timestamp(),
        exp: expiration.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {e}")))
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret-with-enough-length!";

    #[test]
    fn round_trip_preserves_identity() {
        let user_id = Uuid::new_v4();
        let token = create_jwt(user_id, "a@x.com", SECRET, 900).unwrap();

        let claims = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_jwt(Uuid::new_v4(), "a@x.com", SECRET, 900).unwrap();
        assert!(verify_jwt(&token, "some-other-secret-also-long-enough").is_err());
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(verify_jwt("not.a.jwt", SECRET).is_err());
        assert!(verify_jwt("", SECRET).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = create_jwt(Uuid::new_v4(), "a@x.com", SECRET, -10).unwrap();
        let err = verify_jwt(&token, SECRET).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn token_expires_after_its_lifetime() {
        let token = create_jwt(Uuid::new_v4(), "a@x.com", SECRET, 1).unwrap();
        assert!(verify_jwt(&token, SECRET).is_ok());

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;
        assert!(verify_jwt(&token, SECRET).is_err());
    }
}
