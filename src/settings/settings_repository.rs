use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use super::settings_models::{AppSetting, DefaultSetting};
use crate::error::Result;

#[derive(Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn find_all(&self) -> Result<Vec<AppSetting>> {
        let settings = sqlx::query_as::<_, AppSetting>(
            "SELECT * FROM app_settings ORDER BY setting_group ASC, key ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn find_by_group(&self, group: &str) -> Result<Vec<AppSetting>> {
        let settings = sqlx::query_as::<_, AppSetting>(
            "SELECT * FROM app_settings WHERE setting_group = ? ORDER BY key ASC",
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    pub async fn find_by_key(&self, key: &str) -> Result<Option<AppSetting>> {
        let setting = sqlx::query_as::<_, AppSetting>("SELECT * FROM app_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(setting)
    }

    pub async fn find_by_key_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        key: &str,
    ) -> Result<Option<AppSetting>> {
        let setting = sqlx::query_as::<_, AppSetting>("SELECT * FROM app_settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(setting)
    }

    pub async fn update_value(&self, key: &str, value: &str) -> Result<Option<AppSetting>> {
        let setting = sqlx::query_as::<_, AppSetting>(
            "UPDATE app_settings SET value = ?, updated_at = ? WHERE key = ? RETURNING *",
        )
        .bind(value)
        .bind(Utc::now())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    pub async fn update_value_with_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        key: &str,
        value: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE app_settings SET value = ?, updated_at = ? WHERE key = ?")
            .bind(value)
            .bind(Utc::now())
            .bind(key)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Inserts the default unless the key already exists. Returns true when inserted.
    pub async fn insert_if_missing(&self, setting: &DefaultSetting) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO app_settings (id, key, value, value_type, label, setting_group, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (key) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(setting.key)
        .bind(setting.value)
        .bind(setting.value_type)
        .bind(setting.label)
        .bind(setting.group)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
