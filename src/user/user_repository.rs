use chrono::{DateTime, Utc};
use sqlx::{query::QueryAs, sqlite::SqliteArguments, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::user_models::{NewUser, User};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &NewUser) -> Result<User> {
        insert_user(user)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique_violation)
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user: &NewUser,
    ) -> Result<User> {
        insert_user(user)
            .fetch_one(&mut **tx)
            .await
            .map_err(map_unique_violation)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_by_id_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
    ) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(user)
    }

    /// Exact, case-sensitive match on the stored address.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = ? AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE users SET last_login_at = ?, updated_at = ? WHERE id = ?")
            .bind(at)
            .bind(at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn update_password_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub async fn update_profile(&self, user_id: Uuid, name: Option<String>) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL RETURNING *",
        )
        .bind(name)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user)
    }
}

fn insert_user(user: &NewUser) -> QueryAs<'_, Sqlite, User, SqliteArguments<'_>> {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, password_hash, name, role, is_active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.role)
    .bind(user.is_active)
    .bind(user.created_at)
    .bind(user.created_at)
}

/// The partial unique index on `email` is the only duplicate check.
pub fn map_unique_violation(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::UserExists,
        _ => AppError::Database(err),
    }
}
