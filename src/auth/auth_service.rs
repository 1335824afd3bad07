use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::auth_dto::{ChangePasswordRequest, RegisterRequest};
use super::auth_models::generate_opaque_token;
use super::auth_repository::RefreshTokenRepository;
use super::jwt::create_jwt;
use super::password::{hash_password_async, verify_password_async};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::user::{NewUser, Role, User, UserRepository};

/// Everything a successful register or login hands back to the client.
#[derive(Debug)]
pub struct AuthSession {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    user_repo: UserRepository,
    refresh_token_repo: RefreshTokenRepository,
    config: Arc<Config>,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        user_repo: UserRepository,
        refresh_token_repo: RefreshTokenRepository,
        config: Arc<Config>,
    ) -> Self {
        Self {
            pool,
            user_repo,
            refresh_token_repo,
            config,
        }
    }

    pub fn access_token_ttl(&self) -> i64 {
        self.config.jwt_expires_in
    }

    fn issue_access_token(&self, user: &User) -> Result<String> {
        create_jwt(
            user.id,
            &user.email,
            &self.config.jwt_secret,
            self.config.jwt_expires_in,
        )
    }

    fn refresh_expiry(&self) -> chrono::DateTime<Utc> {
        Utc::now() + Duration::days(self.config.refresh_token_expires_days)
    }

    pub async fn register(&self, input: RegisterRequest) -> Result<AuthSession> {
        let password_hash = hash_password_async(input.password).await?;
        let name = input.name.filter(|n| !n.trim().is_empty());
        let new_user = NewUser::new(input.email, password_hash, name, Role::User);
        let refresh_token = generate_opaque_token();

        // The user row and its first session land together or not at all.
        let mut tx = self.pool.begin().await?;
        let user = self.user_repo.create_with_tx(&mut tx, &new_user).await?;
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &refresh_token, self.refresh_expiry())
            .await?;
        tx.commit().await?;

        let access_token = self.issue_access_token(&user)?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession> {
        let mut user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password_async(password.to_string(), user.password_hash.clone()).await? {
            tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_active {
            tracing::debug!(user_id = %user.id, "Login rejected: inactive account");
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        self.user_repo.update_last_login(user.id, now).await?;
        user.last_login_at = Some(now);
        user.updated_at = now;

        let refresh_token = self.create_refresh_token(user.id).await?;
        let access_token = self.issue_access_token(&user)?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(AuthSession {
            user,
            access_token,
            refresh_token,
        })
    }

    pub async fn create_refresh_token(&self, user_id: Uuid) -> Result<String> {
        let token = generate_opaque_token();
        self.refresh_token_repo
            .create(user_id, &token, self.refresh_expiry())
            .await?;
        Ok(token)
    }

    /// Exchanges a refresh token for a new access token. The refresh token
    /// itself is left untouched.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<String> {
        let stored = self
            .refresh_token_repo
            .find_by_token(refresh_token)
            .await?
            .ok_or(AppError::InvalidRefreshToken)?;

        if stored.is_expired_at(Utc::now()) {
            self.refresh_token_repo.delete_by_id(stored.id).await?;
            tracing::debug!(user_id = %stored.user_id, "Expired refresh token removed");
            return Err(AppError::RefreshTokenExpired);
        }

        let user = self
            .user_repo
            .find_by_id(stored.user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or(AppError::InvalidRefreshToken)?;

        self.issue_access_token(&user)
    }

    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<()> {
        let removed = self.refresh_token_repo.delete_by_token(refresh_token).await?;
        tracing::debug!(removed, "Refresh token revoked");
        Ok(())
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn update_profile(&self, user_id: Uuid, name: Option<String>) -> Result<User> {
        let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        self.user_repo.update_profile(user_id, name).await
    }

    /// Existing sessions stay valid after a password change.
    pub async fn change_password(&self, user_id: Uuid, input: ChangePasswordRequest) -> Result<()> {
        let user = self.get_user(user_id).await?;

        if !verify_password_async(input.current_password, user.password_hash).await? {
            return Err(AppError::IncorrectPassword);
        }

        let password_hash = hash_password_async(input.new_password).await?;
        self.user_repo.update_password(user_id, &password_hash).await?;
        tracing::info!(%user_id, "Password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::verify_jwt;
    use crate::db::test_pool;

    async fn service() -> (AuthService, RefreshTokenRepository) {
        let pool = test_pool().await;
        let refresh_repo = RefreshTokenRepository::new(pool.clone());
        let service = AuthService::new(
            pool.clone(),
            UserRepository::new(pool),
            refresh_repo.clone(),
            Arc::new(Config::for_tests()),
        );
        (service, refresh_repo)
    }

    fn register_input(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "password123".to_string(),
            name: Some("Ann".to_string()),
        }
    }

    #[tokio::test]
    async fn register_issues_tokens() {
        let (service, refresh_repo) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();

        let claims = verify_jwt(&session.access_token, &service.config.jwt_secret).unwrap();
        assert_eq!(claims.user_id, session.user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(session.user.role, Role::User);
        assert!(refresh_repo
            .find_by_token(&session.refresh_token)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn duplicate_register_conflicts_without_partial_rows() {
        let (service, refresh_repo) = service().await;
        let first = service.register(register_input("a@x.com")).await.unwrap();

        let err = service.register(register_input("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::UserExists));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&service.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(refresh_repo.count_for_user(first.user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (service, _) = service().await;
        service.register(register_input("a@x.com")).await.unwrap();

        let unknown = service.login("nobody@x.com", "password123").await.unwrap_err();
        let wrong = service.login("a@x.com", "wrong-password").await.unwrap_err();
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn inactive_account_cannot_login() {
        let (service, _) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();
        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(session.user.id)
            .execute(&service.pool)
            .await
            .unwrap();

        let err = service.login("a@x.com", "password123").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn login_records_last_login() {
        let (service, _) = service().await;
        service.register(register_input("a@x.com")).await.unwrap();

        let session = service.login("a@x.com", "password123").await.unwrap();
        assert!(session.user.last_login_at.is_some());

        let stored = service.get_user(session.user.id).await.unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn refresh_with_unknown_token_is_invalid() {
        let (service, _) = service().await;
        let err = service.refresh_access_token("does-not-exist").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn refresh_with_expired_token_deletes_it() {
        let (service, refresh_repo) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();

        refresh_repo
            .create(session.user.id, "stale-token", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let err = service.refresh_access_token("stale-token").await.unwrap_err();
        assert!(matches!(err, AppError::RefreshTokenExpired));
        assert!(refresh_repo.find_by_token("stale-token").await.unwrap().is_none());

        let again = service.refresh_access_token("stale-token").await.unwrap_err();
        assert!(matches!(again, AppError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn refresh_is_not_rotating() {
        let (service, refresh_repo) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();

        let access = service
            .refresh_access_token(&session.refresh_token)
            .await
            .unwrap();
        let claims = verify_jwt(&access, &service.config.jwt_secret).unwrap();
        assert_eq!(claims.user_id, session.user.id);

        assert!(refresh_repo
            .find_by_token(&session.refresh_token)
            .await
            .unwrap()
            .is_some());
        assert!(service
            .refresh_access_token(&session.refresh_token)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (service, _) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();

        service.revoke_refresh_token(&session.refresh_token).await.unwrap();
        service.revoke_refresh_token(&session.refresh_token).await.unwrap();

        let err = service
            .refresh_access_token(&session.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn change_password_requires_current_and_keeps_sessions() {
        let (service, refresh_repo) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();

        let err = service
            .change_password(
                session.user.id,
                ChangePasswordRequest {
                    current_password: "nope-nope".to_string(),
                    new_password: "newpassword1".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IncorrectPassword));

        service
            .change_password(
                session.user.id,
                ChangePasswordRequest {
                    current_password: "password123".to_string(),
                    new_password: "newpassword1".to_string(),
                },
            )
            .await
            .unwrap();

        assert!(service.login("a@x.com", "password123").await.is_err());
        assert!(service.login("a@x.com", "newpassword1").await.is_ok());
        assert!(refresh_repo
            .find_by_token(&session.refresh_token)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn update_profile_trims_name() {
        let (service, _) = service().await;
        let session = service.register(register_input("a@x.com")).await.unwrap();

        let user = service
            .update_profile(session.user.id, Some("  Bea  ".to_string()))
            .await
            .unwrap();
        assert_eq!(user.name.as_deref(), Some("Bea"));

        let cleared = service.update_profile(session.user.id, Some("   ".to_string())).await.unwrap();
        assert!(cleared.name.is_none());
    }

    #[tokio::test]
    async fn refresh_for_inactive_or_deleted_owner_is_invalid() {
        let (service, _) = service().await;
        let idle = service.register(register_input("idle@x.com")).await.unwrap();
        let gone = service.register(register_input("gone@x.com")).await.unwrap();

        sqlx::query("UPDATE users SET is_active = 0 WHERE id = ?")
            .bind(idle.user.id)
            .execute(&service.pool)
            .await
            .unwrap();
        sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(gone.user.id)
            .execute(&service.pool)
            .await
            .unwrap();

        for token in [&idle.refresh_token, &gone.refresh_token] {
            assert!(matches!(
                service.refresh_access_token(token).await,
                Err(AppError::InvalidRefreshToken)
            ));
        }
    }
}
