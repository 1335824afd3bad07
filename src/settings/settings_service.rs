use super::settings_models::{SettingResponse, DEFAULT_SETTINGS};
use super::settings_repository::SettingsRepository;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    /// Inserts any missing default setting; existing values are left alone.
    pub async fn seed_defaults(&self) -> Result<usize> {
        let mut inserted = 0;
        for setting in DEFAULT_SETTINGS {
            if self.repo.insert_if_missing(setting).await? {
                inserted += 1;
            }
        }
        if inserted > 0 {
            tracing::info!(inserted, "Default settings seeded");
        }
        Ok(inserted)
    }

    pub async fn list(&self, group: Option<&str>) -> Result<Vec<SettingResponse>> {
        let settings = match group.filter(|g| !g.is_empty()) {
            Some(group) => self.repo.find_by_group(group).await?,
            None => self.repo.find_all().await?,
        };
        Ok(settings.into_iter().map(SettingResponse::from).collect())
    }

    pub async fn get(&self, key: &str) -> Result<SettingResponse> {
        self.repo
            .find_by_key(key)
            .await?
            .map(SettingResponse::from)
            .ok_or_else(|| AppError::NotFound("Setting not found".to_string()))
    }

    /// Boolean setting value, or `default` when the key is missing or not a boolean.
    pub async fn flag(&self, key: &str, default: bool) -> Result<bool> {
        let value = self.repo.find_by_key(key).await?.map(|s| s.value);
        Ok(match value.as_deref() {
            Some("true") => true,
            Some("false") => false,
            _ => default,
        })
    }

    pub async fn update(&self, key: &str, value: &str) -> Result<SettingResponse> {
        let current = self
            .repo
            .find_by_key(key)
            .await?
            .ok_or_else(|| AppError::NotFound("Setting not found".to_string()))?;

        if !current.value_type.accepts(value) {
            return Err(AppError::BadRequest(format!(
                "Value for {key} is not a valid {:?}",
                current.value_type
            )));
        }

        let updated = self
            .repo
            .update_value(key, value)
            .await?
            .ok_or_else(|| AppError::NotFound("Setting not found".to_string()))?;

        tracing::info!(%key, "Setting updated");
        Ok(updated.into())
    }

    /// Applies every update or none of them.
    pub async fn update_batch(&self, updates: &[(String, String)]) -> Result<Vec<SettingResponse>> {
        let mut tx = self.repo.pool().begin().await?;

        for (key, value) in updates {
            let current = self
                .repo
                .find_by_key_with_tx(&mut tx, key)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Setting not found: {key}")))?;

            if !current.value_type.accepts(value) {
                return Err(AppError::BadRequest(format!(
                    "Value for {key} is not a valid {:?}",
                    current.value_type
                )));
            }

            self.repo.update_value_with_tx(&mut tx, key, value).await?;
        }

        tx.commit().await?;
        tracing::info!(count = updates.len(), "Settings batch updated");

        self.list(None).await
    }
}
