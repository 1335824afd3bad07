pub mod admin_middleware;
pub mod auth;
pub mod rate_limit;
pub mod request_context;

pub use admin_middleware::admin_middleware;
pub use auth::{auth_middleware, AuthUser, CurrentUser};
pub use rate_limit::{global_rate_limit, login_rate_limit, register_rate_limit, RateLimiter};
pub use request_context::request_context_middleware;
