use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::admin::dto::ListUsersQuery;
use crate::error::{AppError, Result};
use crate::user::user_models::{Role, User};

/// Column names a caller may sort the user list by.
const SORTABLE_COLUMNS: &[&str] = &[
    "created_at",
    "updated_at",
    "last_login_at",
    "email",
    "name",
    "role",
];

#[derive(Clone)]
pub struct AdminRepository {
    pool: SqlitePool,
}

/// Field changes for an admin edit. `None` leaves the column as is.
#[derive(Debug, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl AdminRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_users(
        &self,
        query: &ListUsersQuery,
        limit: u32,
        offset: i64,
    ) -> Result<(Vec<User>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_user_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new("SELECT * FROM users");
        push_user_filters(&mut select, query);

        let column = query
            .sort_by
            .as_deref()
            .filter(|c| SORTABLE_COLUMNS.contains(c))
            .unwrap_or("created_at");
        let direction = match query.sort_dir.as_deref() {
            Some(dir) if dir.eq_ignore_ascii_case("asc") => "ASC",
            _ => "DESC",
        };
        select.push(format!(" ORDER BY {column} {direction}"));
        select.push(" LIMIT ").push_bind(limit as i64);
        select.push(" OFFSET ").push_bind(offset);

        let users = select.build_query_as::<User>().fetch_all(&self.pool).await?;

        Ok((users, total))
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub async fn count_active_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND is_active = 1",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_users_with_role(&self, role: Role) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND role = ?",
        )
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_users_created_since(&self, since: DateTime<Utc>) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL AND created_at >= ?",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn find_recent_users(&self, limit: i64) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    pub async fn update_user_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        changes: UserChanges,
    ) -> Result<User> {
        let mut update = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        update.push_bind(Utc::now());
        if let Some(email) = changes.email {
            update.push(", email = ").push_bind(email);
        }
        if let Some(hash) = changes.password_hash {
            update.push(", password_hash = ").push_bind(hash);
        }
        if let Some(name) = changes.name {
            update.push(", name = ").push_bind(name);
        }
        if let Some(role) = changes.role {
            update.push(", role = ").push_bind(role);
        }
        if let Some(is_active) = changes.is_active {
            update.push(", is_active = ").push_bind(is_active);
        }
        update.push(" WHERE id = ").push_bind(user_id);
        update.push(" AND deleted_at IS NULL RETURNING *");

        update
            .build_query_as::<User>()
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_email_conflict)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Returns false when no live user had that id.
    pub async fn soft_delete_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
        )
        .bind(at)
        .bind(at)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn push_user_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &ListUsersQuery) {
    builder.push(" WHERE deleted_at IS NULL");

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (email LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR name LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(role) = query.role {
        builder.push(" AND role = ").push_bind(role);
    }
    if let Some(is_active) = query.is_active {
        builder.push(" AND is_active = ").push_bind(is_active);
    }
}

/// Makes `%`, `_` and `\` match literally inside a LIKE pattern.
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn map_email_conflict(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email already exists".to_string())
        }
        _ => AppError::Database(err),
    }
}
