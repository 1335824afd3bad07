use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections render through the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
