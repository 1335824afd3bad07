use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::state::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub expose_internal_errors: bool,
}

tokio::task_local! {
    static REQUEST_CONTEXT: RequestContext;
}

pub fn current_request_id() -> Option<String> {
    REQUEST_CONTEXT.try_with(|ctx| ctx.request_id.clone()).ok()
}

/// Whether internal error details may be shown to the client.
pub fn expose_internal_errors() -> bool {
    REQUEST_CONTEXT
        .try_with(|ctx| ctx.expose_internal_errors)
        .unwrap_or(false)
}

/// Tags every request with a UUID, echoed in `X-Request-ID` and the envelope meta.
pub async fn request_context_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
        expose_internal_errors: state.config.is_development(),
    };

    let span = tracing::info_span!("request", request_id = %request_id);
    let mut response = REQUEST_CONTEXT
        .scope(ctx, next.run(req))
        .instrument(span)
        .await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
