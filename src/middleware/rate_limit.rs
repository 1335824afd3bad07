use std::{
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::RETRY_AFTER, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    pub name: &'static str,
    pub max_requests: u32,
    pub window: Duration,
    pub message: &'static str,
}

pub const GLOBAL_LIMIT: RateLimitRule = RateLimitRule {
    name: "global",
    max_requests: 100,
    window: Duration::from_secs(60),
    message: "Too many requests, please try again later",
};

pub const LOGIN_LIMIT: RateLimitRule = RateLimitRule {
    name: "login",
    max_requests: 5,
    window: Duration::from_secs(5 * 60),
    message: "Too many login attempts. Try again in 5 minutes.",
};

pub const REGISTER_LIMIT: RateLimitRule = RateLimitRule {
    name: "register",
    max_requests: 3,
    window: Duration::from_secs(60 * 60),
    message: "Too many registration attempts. Try again later.",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: u64 },
}

#[derive(Debug)]
struct Window {
    count: u32,
    started: Instant,
    length: Duration,
}

/// Fixed-window counters keyed by rule name and client address.
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<DashMap<(&'static str, String), Window>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, rule: &RateLimitRule, client: &str) -> Decision {
        self.check_at(rule, client, Instant::now())
    }

    fn check_at(&self, rule: &RateLimitRule, client: &str, now: Instant) -> Decision {
        let mut window = self
            .windows
            .entry((rule.name, client.to_string()))
            .or_insert_with(|| Window {
                count: 0,
                started: now,
                length: rule.window,
            });

        if now.duration_since(window.started) >= rule.window {
            window.count = 0;
            window.started = now;
        }

        if window.count >= rule.max_requests {
            let retry_after = rule
                .window
                .saturating_sub(now.duration_since(window.started))
                .as_secs()
                .max(1);
            return Decision::Limited { retry_after };
        }

        window.count += 1;
        Decision::Allowed {
            remaining: rule.max_requests - window.count,
        }
    }

    /// Drops windows that have run out so idle clients do not accumulate.
    pub fn prune(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < window.length);
        before - self.windows.len()
    }
}

/// Socket peer first, then the first `X-Forwarded-For` hop.
pub fn client_ip(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    req.headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

async fn enforce(rule: &RateLimitRule, state: &AppState, req: Request, next: Next) -> Response {
    let client = client_ip(&req);

    match state.rate_limiter.check(rule, &client) {
        Decision::Allowed { .. } => next.run(req).await,
        Decision::Limited { retry_after } => {
            tracing::warn!(rule = rule.name, %client, "Rate limit exceeded");
            let mut response = AppError::RateLimited(rule.message.to_string()).into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}

pub async fn global_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&GLOBAL_LIMIT, &state, req, next).await
}

pub async fn login_rate_limit(State(state): State<AppState>, req: Request, next: Next) -> Response {
    enforce(&LOGIN_LIMIT, &state, req, next).await
}

pub async fn register_rate_limit(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    enforce(&REGISTER_LIMIT, &state, req, next).await
}
