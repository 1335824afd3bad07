use axum::{extract::Request, middleware::Next, response::Response};

use crate::{error::AppError, middleware::CurrentUser};

/// Runs after `auth_middleware`; lets only admins through.
pub async fn admin_middleware(
    CurrentUser(user): CurrentUser,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        tracing::debug!(user_id = %user.id, "Admin route refused");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
