use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use super::auth_models::{generate_opaque_token, PasswordResetToken};
use super::auth_repository::{PasswordResetRepository, RefreshTokenRepository};
use super::password::hash_password_async;
use crate::email::{templates, EmailSender, TemplateData};
use crate::error::{AppError, Result};
use crate::user::{User, UserRepository};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

#[derive(Clone)]
pub struct PasswordResetService {
    pool: SqlitePool,
    user_repo: UserRepository,
    reset_repo: PasswordResetRepository,
    refresh_token_repo: RefreshTokenRepository,
    email_sender: Arc<dyn EmailSender>,
    frontend_url: String,
}

impl PasswordResetService {
    pub fn new(
        pool: SqlitePool,
        user_repo: UserRepository,
        reset_repo: PasswordResetRepository,
        refresh_token_repo: RefreshTokenRepository,
        email_sender: Arc<dyn EmailSender>,
        frontend_url: String,
    ) -> Self {
        Self {
            pool,
            user_repo,
            reset_repo,
            refresh_token_repo,
            email_sender,
            frontend_url,
        }
    }

    /// Issues a reset token and mails the link. Unknown addresses succeed
    /// silently so callers cannot probe for registered emails.
    pub async fn request_reset(&self, email: &str) -> Result<()> {
        let Some(user) = self.user_repo.find_by_email(email).await? else {
            tracing::debug!("Password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_opaque_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        let mut tx = self.pool.begin().await?;
        self.reset_repo
            .delete_unused_for_user_with_tx(&mut tx, user.id)
            .await?;
        self.reset_repo
            .create_with_tx(&mut tx, user.id, &token, expires_at)
            .await?;
        tx.commit().await?;

        let reset_url = format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        );
        let data: TemplateData = [
            ("ResetURL", reset_url),
            ("ExpiresIn", "1 hour".to_string()),
            ("Name", user.name.clone().unwrap_or_else(|| user.email.clone())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        // The token is already stored, so a delivery failure is only logged.
        if let Err(err) = self
            .email_sender
            .send_template(&[user.email.clone()], templates::PASSWORD_RESET, &data)
            .await
        {
            tracing::error!(user_id = %user.id, error = %err, "Failed to send password reset email");
        }

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(())
    }

    /// Returns the token's owner if it is unused and unexpired.
    pub async fn validate_token(&self, token: &str) -> Result<User> {
        let reset = self
            .reset_repo
            .find_by_token(token)
            .await?
            .filter(|reset| reset.is_valid_at(Utc::now()))
            .ok_or(AppError::InvalidResetToken)?;

        self.user_repo
            .find_by_id(reset.user_id)
            .await?
            .ok_or(AppError::InvalidResetToken)
    }

    /// Sets the new password, burns the token and signs the user out everywhere.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        // Bogus tokens are turned away before paying for a bcrypt hash.
        let reset = self
            .reset_repo
            .find_by_token(token)
            .await?
            .filter(|reset| reset.is_valid_at(Utc::now()))
            .ok_or(AppError::InvalidResetToken)?;

        let password_hash = hash_password_async(new_password.to_string()).await?;
        self.apply_reset(&reset, &password_hash).await
    }

    /// One transaction; claiming the token is the guard, so a token used since
    /// it was looked up rolls everything back.
    async fn apply_reset(&self, reset: &PasswordResetToken, password_hash: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !self
            .reset_repo
            .mark_used_with_tx(&mut tx, reset.id, Utc::now())
            .await?
        {
            return Err(AppError::InvalidResetToken);
        }

        self.user_repo
            .find_by_id_with_tx(&mut tx, reset.user_id)
            .await?
            .ok_or(AppError::InvalidResetToken)?;

        self.user_repo
            .update_password_with_tx(&mut tx, reset.user_id, password_hash)
            .await?;

        let revoked = self
            .refresh_token_repo
            .delete_all_for_user_with_tx(&mut tx, reset.user_id)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %reset.user_id, revoked, "Password reset completed");
        Ok(())
    }

    pub async fn cleanup_expired_tokens(&self) -> Result<u64> {
        let removed = self.reset_repo.delete_expired(Utc::now()).await?;
        if removed > 0 {
            tracing::debug!(removed, "Expired password reset tokens removed");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{hash_password, verify_password};
    use crate::db::test_pool;
    use crate::email::{Email, EmailError, MockSender};
    use crate::user::{NewUser, Role};
    use async_trait::async_trait;

    struct FailingSender;

    #[async_trait]
    impl EmailSender for FailingSender {
        async fn send(&self, _email: Email) -> std::result::Result<(), EmailError> {
            Err(EmailError::Transport("relay down".to_string()))
        }
    }

    struct Fixture {
        service: PasswordResetService,
        users: UserRepository,
        resets: PasswordResetRepository,
        refresh: RefreshTokenRepository,
        mailer: MockSender,
    }

    async fn fixture_with(sender: Option<Arc<dyn EmailSender>>) -> Fixture {
        let pool = test_pool().await;
        let users = UserRepository::new(pool.clone());
        let resets = PasswordResetRepository::new(pool.clone());
        let refresh = RefreshTokenRepository::new(pool.clone());
        let mailer = MockSender::new();
        let sender = sender.unwrap_or_else(|| Arc::new(mailer.clone()));

        let service = PasswordResetService::new(
            pool,
            users.clone(),
            resets.clone(),
            refresh.clone(),
            sender,
            "http://localhost:3000/".to_string(),
        );
        Fixture {
            service,
            users,
            resets,
            refresh,
            mailer,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(None).await
    }

    async fn seed_user(users: &UserRepository, email: &str, password: &str) -> User {
        let hash = hash_password(password).unwrap();
        users
            .create(&NewUser::new(email.to_string(), hash, None, Role::User))
            .await
            .unwrap()
    }

    fn token_from_link(email: &Email) -> String {
        email
            .body
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn unknown_email_creates_nothing_and_sends_nothing() {
        let fx = fixture().await;
        fx.service.request_reset("ghost@x.com").await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens")
            .fetch_one(&fx.service.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert!(fx.mailer.sent_mails().await.is_empty());
    }

    #[tokio::test]
    async fn request_mails_reset_link() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;

        fx.service.request_reset("a@x.com").await.unwrap();

        let mail = fx.mailer.last_email().await.unwrap();
        assert_eq!(mail.to, vec!["a@x.com".to_string()]);
        assert!(mail
            .body
            .contains("http://localhost:3000/reset-password?token="));

        let token = token_from_link(&mail);
        assert_eq!(token.len(), 64);
        let owner = fx.service.validate_token(&token).await.unwrap();
        assert_eq!(owner.id, user.id);
    }

    #[tokio::test]
    async fn new_request_replaces_unused_token() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;

        fx.service.request_reset("a@x.com").await.unwrap();
        let first = token_from_link(&fx.mailer.last_email().await.unwrap());
        fx.service.request_reset("a@x.com").await.unwrap();
        let second = token_from_link(&fx.mailer.last_email().await.unwrap());

        assert_eq!(fx.resets.count_for_user(user.id).await.unwrap(), 1);
        assert!(matches!(
            fx.service.validate_token(&first).await,
            Err(AppError::InvalidResetToken)
        ));
        assert!(fx.service.validate_token(&second).await.is_ok());
    }

    #[tokio::test]
    async fn mail_failure_does_not_fail_request() {
        let fx = fixture_with(Some(Arc::new(FailingSender))).await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;

        fx.service.request_reset("a@x.com").await.unwrap();
        assert_eq!(fx.resets.count_for_user(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn reset_changes_password_and_revokes_sessions() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;
        fx.refresh
            .create(user.id, "session-one", Utc::now() + Duration::days(7))
            .await
            .unwrap();
        fx.refresh
            .create(user.id, "session-two", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        fx.service.request_reset("a@x.com").await.unwrap();
        let token = token_from_link(&fx.mailer.last_email().await.unwrap());

        fx.service
            .reset_password(&token, "brand-new-password")
            .await
            .unwrap();

        let stored = fx.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!verify_password("password123", &stored.password_hash));
        assert!(verify_password("brand-new-password", &stored.password_hash));
        assert_eq!(fx.refresh.count_for_user(user.id).await.unwrap(), 0);

        let used = fx.resets.find_by_token(&token).await.unwrap().unwrap();
        assert!(used.used_at.is_some());

        let reuse = fx
            .service
            .reset_password(&token, "another-password")
            .await
            .unwrap_err();
        assert!(matches!(reuse, AppError::InvalidResetToken));
    }

    #[tokio::test]
    async fn expired_and_unknown_tokens_are_rejected_alike() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;

        let mut tx = fx.service.pool.begin().await.unwrap();
        fx.resets
            .create_with_tx(&mut tx, user.id, "old-token", Utc::now() - Duration::minutes(5))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let expired = fx.service.validate_token("old-token").await.unwrap_err();
        let unknown = fx.service.validate_token("no-such-token").await.unwrap_err();
        assert!(matches!(expired, AppError::InvalidResetToken));
        assert!(matches!(unknown, AppError::InvalidResetToken));

        assert!(matches!(
            fx.service.reset_password("old-token", "whatever123").await,
            Err(AppError::InvalidResetToken)
        ));
        let stored = fx.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("password123", &stored.password_hash));
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_tokens() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;

        let mut tx = fx.service.pool.begin().await.unwrap();
        fx.resets
            .create_with_tx(&mut tx, user.id, "expired", Utc::now() - Duration::hours(2))
            .await
            .unwrap();
        fx.resets
            .create_with_tx(&mut tx, user.id, "fresh", Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(fx.service.cleanup_expired_tokens().await.unwrap(), 1);
        assert!(fx.resets.find_by_token("expired").await.unwrap().is_none());
        assert!(fx.resets.find_by_token("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn token_used_after_lookup_rolls_back() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;
        fx.refresh
            .create(user.id, "session-one", Utc::now() + Duration::days(7))
            .await
            .unwrap();

        fx.service.request_reset("a@x.com").await.unwrap();
        let token = token_from_link(&fx.mailer.last_email().await.unwrap());
        let stale = fx.resets.find_by_token(&token).await.unwrap().unwrap();
        assert!(stale.used_at.is_none());

        // A competing request claims the token first.
        let mut tx = fx.service.pool.begin().await.unwrap();
        assert!(fx
            .resets
            .mark_used_with_tx(&mut tx, stale.id, Utc::now())
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let hash = hash_password("late-password").unwrap();
        let err = fx.service.apply_reset(&stale, &hash).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidResetToken));

        let stored = fx.users.find_by_id(user.id).await.unwrap().unwrap();
        assert!(verify_password("password123", &stored.password_hash));
        assert_eq!(fx.refresh.count_for_user(user.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn expired_token_cannot_be_claimed() {
        let fx = fixture().await;
        let user = seed_user(&fx.users, "a@x.com", "password123").await;

        let mut tx = fx.service.pool.begin().await.unwrap();
        let reset = fx
            .resets
            .create_with_tx(&mut tx, user.id, "short-lived", Utc::now() + Duration::minutes(1))
            .await
            .unwrap();
        assert!(!fx
            .resets
            .mark_used_with_tx(&mut tx, reset.id, Utc::now() + Duration::minutes(2))
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let stored = fx.resets.find_by_token("short-lived").await.unwrap().unwrap();
        assert!(stored.used_at.is_none());
    }
}
