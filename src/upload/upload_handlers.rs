use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::upload_service::{IncomingFile, MAX_FILES_PER_REQUEST};
use crate::{
    error::{AppError, Result},
    middleware::AuthUser,
    response::{ApiResponse, FieldError, MessageResponse},
    state::AppState,
    storage::FileInfo,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub file: FileInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedFile {
    pub filename: String,
    pub file: FileInfo,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FailedUpload {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MultiUploadResponse {
    pub uploaded: Vec<UploadedFile>,
    pub errors: Vec<FailedUpload>,
}

fn missing_field(field: &str, message: &str) -> AppError {
    AppError::Validation(vec![FieldError {
        field: field.to_string(),
        message: message.to_string(),
    }])
}

/// Drains the form, keeping every part named `field_name`.
async fn collect_files(multipart: &mut Multipart, field_name: &str) -> Result<Vec<IncomingFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {e}")))?
    {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {e}")))?;

        files.push(IncomingFile {
            filename,
            content_type,
            data: data.to_vec(),
        });
    }

    Ok(files)
}

/// Upload a single file
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "upload",
    request_body(content = String, content_type = "multipart/form-data", description = "Form field `file`"),
    responses(
        (status = 201, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "Missing or rejected file"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_single(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let file = collect_files(&mut multipart, "file")
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| missing_field("file", "file is required"))?;

    tracing::debug!(%user_id, filename = %file.filename, "Single upload requested");
    let info = state.upload_service.upload(file).await?;

    Ok((StatusCode::CREATED, ApiResponse::success(UploadResponse { file: info })))
}

/// Upload up to ten files, reporting failures per file
#[utoipa::path(
    post,
    path = "/api/upload/multiple",
    tag = "upload",
    request_body(content = String, content_type = "multipart/form-data", description = "Repeated form field `files`"),
    responses(
        (status = 201, description = "Upload results", body = MultiUploadResponse),
        (status = 400, description = "No files or too many files"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_multiple(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let files = collect_files(&mut multipart, "files").await?;
    if files.is_empty() {
        return Err(missing_field("files", "files is required"));
    }
    if files.len() > MAX_FILES_PER_REQUEST {
        return Err(AppError::BadRequest(format!(
            "Too many files (max: {MAX_FILES_PER_REQUEST})"
        )));
    }

    tracing::debug!(%user_id, count = files.len(), "Multiple upload requested");

    let mut uploaded = Vec::new();
    let mut errors = Vec::new();
    for file in files {
        let filename = file.filename.clone();
        match state.upload_service.upload(file).await {
            Ok(info) => uploaded.push(UploadedFile {
                filename,
                file: info,
            }),
            Err(err) => errors.push(FailedUpload {
                filename,
                error: err.to_string(),
            }),
        }
    }

    Ok((
        StatusCode::CREATED,
        ApiResponse::success(MultiUploadResponse { uploaded, errors }),
    ))
}

/// Delete an uploaded file by key
#[utoipa::path(
    delete,
    path = "/api/upload/{key}",
    tag = "upload",
    params(("key" = String, Path, description = "Storage key, may contain slashes")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Invalid key"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_upload(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(key): Path<String>,
) -> Result<impl IntoResponse> {
    tracing::debug!(%user_id, %key, "Upload deletion requested");
    state.upload_service.delete(&key).await?;

    Ok(ApiResponse::success(MessageResponse::new(
        "File deleted successfully",
    )))
}
