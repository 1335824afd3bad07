use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::auth_models::{PasswordResetToken, RefreshToken};
use crate::error::Result;

#[derive(Clone)]
pub struct RefreshTokenRepository {
    pool: SqlitePool,
}

impl RefreshTokenRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(
            "INSERT INTO refresh_tokens (id, token, user_id, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken> {
        let row = sqlx::query_as::<_, RefreshToken>(
            "INSERT INTO refresh_tokens (id, token, user_id, expires_at, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshToken>("SELECT * FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn delete_by_id(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Returns the number of rows removed; zero for an unknown token.
    pub async fn delete_by_token(&self, token: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete_all_for_user_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        Ok(result.rows_affected())
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Clone)]
pub struct PasswordResetRepository {
    pool: SqlitePool,
}

impl PasswordResetRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn delete_unused_for_user_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = ? AND used_at IS NULL")
                .bind(user_id)
                .execute(&mut **tx)
                .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<PasswordResetToken> {
        let row = sqlx::query_as::<_, PasswordResetToken>(
            "INSERT INTO password_reset_tokens (id, token, user_id, expires_at, used_at, created_at)
             VALUES (?, ?, ?, ?, NULL, ?)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(token)
        .bind(user_id)
        .bind(expires_at)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(row)
    }

    pub async fn find_by_token(&self, token: &str) -> Result<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn find_by_token_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        token: &str,
    ) -> Result<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row)
    }

    /// Sets `used_at` only if the token is still unused and unexpired at `at`.
    /// False means another request won or the token ran out.
    pub async fn mark_used_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE password_reset_tokens SET used_at = ?
             WHERE id = ? AND used_at IS NULL AND expires_at > ?",
        )
        .bind(at)
        .bind(id)
        .bind(at)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM password_reset_tokens WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM password_reset_tokens WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
