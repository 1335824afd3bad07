use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    String,
    Number,
    Boolean,
    Json,
}

impl SettingType {
    /// Whether `value` can be read back as this type.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            SettingType::String => true,
            SettingType::Number => value
                .trim()
                .parse::<f64>()
                .is_ok_and(|n| n.is_finite()),
            SettingType::Boolean => matches!(value, "true" | "false"),
            SettingType::Json => serde_json::from_str::<serde_json::Value>(value).is_ok(),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct AppSetting {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    pub value_type: SettingType,
    pub label: Option<String>,
    pub setting_group: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingResponse {
    pub id: Uuid,
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: SettingType,
    pub label: Option<String>,
    pub group: String,
    pub updated_at: DateTime<Utc>,
}

impl From<AppSetting> for SettingResponse {
    fn from(setting: AppSetting) -> Self {
        Self {
            id: setting.id,
            key: setting.key,
            value: setting.value,
            value_type: setting.value_type,
            label: setting.label,
            group: setting.setting_group,
            updated_at: setting.updated_at,
        }
    }
}

pub struct DefaultSetting {
    pub key: &'static str,
    pub value: &'static str,
    pub value_type: SettingType,
    pub label: &'static str,
    pub group: &'static str,
}

pub const DEFAULT_SETTINGS: &[DefaultSetting] = &[
    DefaultSetting {
        key: "app_name",
        value: "My App",
        value_type: SettingType::String,
        label: "Application Name",
        group: "general",
    },
    DefaultSetting {
        key: "app_description",
        value: "A Rust + axum starter application",
        value_type: SettingType::String,
        label: "Description",
        group: "general",
    },
    DefaultSetting {
        key: "maintenance_mode",
        value: "false",
        value_type: SettingType::Boolean,
        label: "Maintenance Mode",
        group: "general",
    },
    DefaultSetting {
        key: "allow_registration",
        value: "true",
        value_type: SettingType::Boolean,
        label: "Allow Registration",
        group: "auth",
    },
    DefaultSetting {
        key: "max_login_attempts",
        value: "5",
        value_type: SettingType::Number,
        label: "Max Login Attempts",
        group: "auth",
    },
];
