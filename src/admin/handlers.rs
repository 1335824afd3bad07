use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    admin::dto::{
        BatchUpdateSettingsRequest, CreateUserRequest, FilesQuery, ListUsersQuery, SettingsQuery,
        UpdateSettingRequest, UpdateUserRequest,
    },
    error::Result,
    extract::AppJson,
    middleware::AuthUser,
    response::{ApiResponse, MessageResponse},
    state::AppState,
    user::UserResponse,
};

/// Dashboard statistics
#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "admin",
    responses(
        (status = 200, description = "User statistics", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_dashboard(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let stats = state.admin_service.dashboard_stats(Utc::now()).await?;
    Ok(ApiResponse::success(stats))
}

/// List users with search, filters and pagination
#[utoipa::path(
    get,
    path = "/api/admin/users",
    tag = "admin",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Paginated users: items, total, page, pageSize, totalPages"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - Admin access required")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse> {
    let page = state.admin_service.list_users(&query).await?;
    Ok(ApiResponse::success(page))
}

/// Get a user by ID
#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let user = state.admin_service.get_user(user_id).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/admin/users",
    tag = "admin",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state.admin_service.create_user(payload).await?;
    Ok((StatusCode::CREATED, ApiResponse::success(UserResponse::from(user))))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already exists")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let user = state.admin_service.update_user(user_id, payload).await?;
    Ok(ApiResponse::success(UserResponse::from(user)))
}

/// Soft-delete a user
#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    tag = "admin",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(actor_id): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state.admin_service.delete_user(actor_id, user_id).await?;
    Ok(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    )))
}

/// List settings, optionally by group
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    tag = "admin",
    params(SettingsQuery),
    responses((status = 200, description = "Settings", body = [SettingResponse])),
    security(("bearer_auth" = []))
)]
pub async fn list_settings(
    State(state): State<AppState>,
    Query(query): Query<SettingsQuery>,
) -> Result<impl IntoResponse> {
    let settings = state.settings_service.list(query.group.as_deref()).await?;
    Ok(ApiResponse::success(settings))
}

/// Get one setting
#[utoipa::path(
    get,
    path = "/api/admin/settings/{key}",
    tag = "admin",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 200, description = "Setting", body = SettingResponse),
        (status = 404, description = "Setting not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    let setting = state.settings_service.get(&key).await?;
    Ok(ApiResponse::success(setting))
}

/// Update one setting
#[utoipa::path(
    put,
    path = "/api/admin/settings/{key}",
    tag = "admin",
    params(("key" = String, Path, description = "Setting key")),
    request_body = UpdateSettingRequest,
    responses(
        (status = 200, description = "Setting updated", body = SettingResponse),
        (status = 400, description = "Value does not match the setting type"),
        (status = 404, description = "Setting not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    AppJson(payload): AppJson<UpdateSettingRequest>,
) -> Result<impl IntoResponse> {
    let setting = state.settings_service.update(&key, &payload.value).await?;
    Ok(ApiResponse::success(setting))
}

/// Update several settings at once
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    tag = "admin",
    request_body = BatchUpdateSettingsRequest,
    responses(
        (status = 200, description = "All settings after the update", body = [SettingResponse]),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Unknown setting key")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_settings(
    State(state): State<AppState>,
    AppJson(payload): AppJson<BatchUpdateSettingsRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let updates: Vec<(String, String)> = payload
        .settings
        .into_iter()
        .map(|s| (s.key, s.value))
        .collect();
    let settings = state.settings_service.update_batch(&updates).await?;
    Ok(ApiResponse::success(settings))
}

/// List uploaded files
#[utoipa::path(
    get,
    path = "/api/admin/files",
    tag = "admin",
    params(FilesQuery),
    responses(
        (status = 200, description = "Directory listing", body = FileListing),
        (status = 400, description = "Invalid directory path")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> Result<impl IntoResponse> {
    let listing = state.file_browser.list(query.dir.as_deref()).await?;
    Ok(ApiResponse::success(listing))
}

/// Delete an uploaded file or directory
#[utoipa::path(
    delete,
    path = "/api/admin/files/{path}",
    tag = "admin",
    params(("path" = String, Path, description = "Path relative to the upload root")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Invalid file path"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse> {
    state.file_browser.delete(&path).await?;
    Ok(ApiResponse::success(MessageResponse::new(
        "File deleted successfully",
    )))
}
