use axum::{
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::middleware::request_context::current_request_id;

/// Uniform envelope wrapping every JSON body the API produces.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiErrorBody>,
    pub meta: ResponseMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMeta {
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ResponseMeta {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            request_id: current_request_id(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            meta: ResponseMeta::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiErrorBody {
                code: code.into(),
                message: message.into(),
                details,
            }),
            meta: ResponseMeta::now(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_omits_error() {
        let body = serde_json::to_value(ApiResponse::success(MessageResponse::new("ok"))).unwrap();

        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["message"], "ok");
        assert!(body.get("error").is_none());
        assert!(body["meta"]["timestamp"].is_string());
    }

    #[test]
    fn failure_envelope_carries_code_and_details() {
        let details = vec![FieldError {
            field: "email".to_string(),
            message: "email must be a valid email address".to_string(),
        }];
        let body = serde_json::to_value(ApiResponse::failure(
            "VALIDATION_ERROR",
            "Validation failed",
            Some(details),
        ))
        .unwrap();

        assert_eq!(body["success"], false);
        assert!(body.get("data").is_none());
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "email");
    }
}
