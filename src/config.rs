use std::fmt;

const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-min-32-chars";
const MIN_JWT_SECRET_LEN: usize = 32;
/// Upper bounds keep the derived timestamps and cookie ages representable.
const MAX_JWT_EXPIRES_IN_SECS: i64 = 30 * 24 * 60 * 60;
const MAX_REFRESH_TOKEN_DAYS: i64 = 3650;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set in production")]
    MissingJwtSecret,
    #[error("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters in production")]
    WeakJwtSecret,
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SameSite::Lax => "Lax",
            SameSite::Strict => "Strict",
            SameSite::None => "None",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_env: AppEnv,
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    pub jwt_expires_in: i64,
    pub refresh_token_expires_days: i64,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub cookie_same_site: SameSite,
    pub upload_dir: String,
    pub upload_base_url: String,
    pub s3: Option<S3Config>,
    pub smtp: Option<SmtpConfig>,
    pub cleanup_cron: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let app_env = match get("APP_ENV", "development").to_lowercase().as_str() {
            "development" | "dev" => AppEnv::Development,
            "production" | "prod" => AppEnv::Production,
            "test" => AppEnv::Test,
            other => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV",
                    value: other.to_string(),
                })
            }
        };

        let jwt_secret = match (lookup("JWT_SECRET"), app_env) {
            (None, AppEnv::Production) => return Err(ConfigError::MissingJwtSecret),
            (Some(secret), AppEnv::Production) if secret.len() < MIN_JWT_SECRET_LEN => {
                return Err(ConfigError::WeakJwtSecret)
            }
            (Some(secret), _) => secret,
            (None, _) => {
                tracing::warn!("JWT_SECRET not set, using development fallback secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let raw_expiry = get("JWT_EXPIRES_IN", "15m");
        let jwt_expires_in = parse_duration(&raw_expiry)
            .filter(|secs| *secs <= MAX_JWT_EXPIRES_IN_SECS)
            .ok_or(ConfigError::Invalid {
                key: "JWT_EXPIRES_IN",
                value: raw_expiry,
            })?;

        let refresh_token_expires_days = parse_number(&lookup, "REFRESH_TOKEN_EXPIRES_DAYS", 7)?;
        if !(1..=MAX_REFRESH_TOKEN_DAYS).contains(&refresh_token_expires_days) {
            return Err(ConfigError::Invalid {
                key: "REFRESH_TOKEN_EXPIRES_DAYS",
                value: refresh_token_expires_days.to_string(),
            });
        }

        let cookie_same_site = match get("COOKIE_SAMESITE", "Lax").to_lowercase().as_str() {
            "lax" => SameSite::Lax,
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            other => {
                return Err(ConfigError::Invalid {
                    key: "COOKIE_SAMESITE",
                    value: other.to_string(),
                })
            }
        };

        let cors_origins = get("CORS_ORIGINS", "http://localhost:3000")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let s3 = lookup("S3_BUCKET").map(|bucket| S3Config {
            bucket,
            region: get("S3_REGION", "us-east-1"),
            endpoint: lookup("S3_ENDPOINT"),
            access_key: lookup("S3_ACCESS_KEY"),
            secret_key: lookup("S3_SECRET_KEY"),
        });

        let smtp = match lookup("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_number(&lookup, "SMTP_PORT", 587)?,
                user: lookup("SMTP_USER"),
                password: lookup("SMTP_PASSWORD"),
                from_name: get("SMTP_FROM_NAME", "Starter App"),
                from_address: get("SMTP_FROM_ADDRESS", "noreply@example.com"),
            }),
            None => None,
        };

        Ok(Self {
            app_env,
            host: get("HOST", "0.0.0.0"),
            port: parse_number(&lookup, "PORT", 3001)?,
            database_url: get("DATABASE_URL", "sqlite://data/app.db?mode=rwc"),
            jwt_secret,
            jwt_expires_in,
            refresh_token_expires_days,
            frontend_url: get("FRONTEND_URL", "http://localhost:3000"),
            cors_origins,
            cookie_same_site,
            upload_dir: get("UPLOAD_DIR", "./data/uploads"),
            upload_base_url: get("UPLOAD_BASE_URL", "/uploads"),
            s3,
            smtp,
            cleanup_cron: get("CLEANUP_CRON", "0 0 * * * *"),
        })
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    pub fn secure_cookies(&self) -> bool {
        self.is_production() || self.cookie_same_site == SameSite::None
    }

    pub fn refresh_token_max_age(&self) -> i64 {
        self.refresh_token_expires_days * 24 * 60 * 60
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::from_lookup(|key| match key {
            "APP_ENV" => Some("test".to_string()),
            "JWT_SECRET" => Some("test-secret-that-is-long-enough-for-hs256".to_string()),
            "DATABASE_URL" => Some("sqlite::memory:".to_string()),
            _ => None,
        })
        .expect("test config is valid")
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Parses `30s`, `15m`, `2h`, `7d` or a bare number of seconds.
pub fn parse_duration(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (digits, multiplier) = match raw.chars().last()? {
        's' => (&raw[..raw.len() - 1], 1),
        'm' => (&raw[..raw.len() - 1], 60),
        'h' => (&raw[..raw.len() - 1], 60 * 60),
        'd' => (&raw[..raw.len() - 1], 24 * 60 * 60),
        c if c.is_ascii_digit() => (raw, 1),
        _ => return None,
    };
    let value: i64 = digits.parse().ok()?;
    if value <= 0 {
        return None;
    }
    value.checked_mul(multiplier)
}
