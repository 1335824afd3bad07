use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::pagination::PageParams;
use crate::user::user_models::{Role, User};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Substring match on email or name.
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// One of `created_at`, `updated_at`, `last_login_at`, `email`, `name`, `role`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_dir: Option<String>,
}

impl ListUsersQuery {
    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page,
            page_size: self.page_size,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(
        length(min = 8, max = 128),
        custom(function = "crate::auth::password::validate_password_bytes")
    )]
    pub password: String,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(
        length(min = 8, max = 128),
        custom(function = "crate::auth::password::validate_password_bytes")
    )]
    pub password: Option<String>,
    #[validate(length(max = 100))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub admin_users: i64,
    pub new_users_today: i64,
    pub new_users_this_week: i64,
    pub new_users_this_month: i64,
    pub recent_users: Vec<RecentUser>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for RecentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SettingsQuery {
    pub group: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingRequest {
    pub value: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct BatchUpdateSettingsRequest {
    #[validate(length(min = 1, message = "settings must contain at least one entry"))]
    pub settings: Vec<SettingUpdate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilesQuery {
    /// Directory relative to the upload root.
    pub dir: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub mod_time: Option<DateTime<Utc>>,
    pub extension: String,
    pub mime_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileListing {
    pub files: Vec<FileEntry>,
    pub total: usize,
    pub total_size: u64,
    pub current_dir: String,
}
