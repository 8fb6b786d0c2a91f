use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// 默认令牌有效期：30天
const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 720;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// 未配置时使用内存存储
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// 未配置时不启用限流
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub bcrypt_cost: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub request_timeout_secs: u64,
    pub upload_dir: PathBuf,
    pub public_base_url: String,
}

impl Config {
    /// 本地默认配置，签名密钥必须由调用方提供
    pub fn local(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            db_max_connections: 10,
            redis_url: None,
            jwt_secret: jwt_secret.into(),
            jwt_expiration_secs: DEFAULT_JWT_EXPIRATION_HOURS * 3600,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
            server_host: "0.0.0.0".into(),
            server_port: 5000,
            api_base_uri: "/api".into(),
            request_timeout_secs: 30,
            upload_dir: PathBuf::from("uploads"),
            public_base_url: String::new(),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                value: "<empty>".into(),
            });
        }
        let defaults = Self::local(jwt_secret);

        let jwt_expiration_hours = match optional("JWT_EXPIRATION") {
            Some(raw) => parse_hours(&raw).ok_or(ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value: raw,
            })?,
            None => DEFAULT_JWT_EXPIRATION_HOURS,
        };

        Ok(Config {
            database_url: optional("DATABASE_URL"),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            redis_url: optional("REDIS_URL"),
            jwt_expiration_secs: jwt_expiration_hours * 3600,
            bcrypt_cost: parsed("BCRYPT_COST", defaults.bcrypt_cost)?,
            rate_limit_window_secs: parsed("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs)?,
            rate_limit_requests: parsed("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            server_host: optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed("SERVER_PORT", defaults.server_port)?,
            api_base_uri: optional("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
            upload_dir: optional("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            public_base_url: optional("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            jwt_secret: defaults.jwt_secret,
        })
    }

    pub fn jwt_expiration(&self) -> Duration {
        Duration::from_secs(self.jwt_expiration_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// 支持 "720" 或 "720h" 两种写法
fn parse_hours(raw: &str) -> Option<u64> {
    raw.trim().trim_end_matches('h').parse().ok()
}
