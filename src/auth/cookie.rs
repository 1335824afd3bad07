use axum::http::{header::COOKIE, HeaderMap};

use crate::config::Config;

pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// `Set-Cookie` value carrying a freshly issued refresh token.
pub fn refresh_cookie(config: &Config, token: &str) -> String {
    let mut cookie = format!(
        "{REFRESH_TOKEN_COOKIE}={token}; HttpOnly; Path=/; Max-Age={}; SameSite={}",
        config.refresh_token_max_age(),
        config.cookie_same_site
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_refresh_cookie(config: &Config) -> String {
    let mut cookie = format!(
        "{REFRESH_TOKEN_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite={}",
        config.cookie_same_site
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Value of the named cookie across every `Cookie` header, if present and non-empty.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
