// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;
use url::Url;

const DEFAULT_PORT: u16 = 5005;
const DEFAULT_JWT_EXPIRATION: u64 = 3600;
const DEFAULT_TRIVIA_API_URL: &str = "https://opentdb.com/";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173";

#[derive(Debug, Clone)]
pub struct Config {
    /// `postgres://...` for the SQL store, `memory://` for the in-process store.
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens, in seconds.
    pub jwt_expiration: u64,
    pub port: u16,
    pub rust_log: String,
    /// Base URL of the Open Trivia DB compatible upstream.
    pub trivia_api_url: Url,
    pub cors_origins: Vec<String>,
}

/// Raised when the process environment cannot produce a usable `Config`.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str, String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid(key, reason) => write!(f, "{} is invalid: {}", key, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = match env::var("JWT_EXPIRATION") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| ConfigError::Invalid("JWT_EXPIRATION", e.to_string()))?,
            Err(_) => DEFAULT_JWT_EXPIRATION,
        };

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::Invalid("PORT", e.to_string()))?,
            Err(_) => DEFAULT_PORT,
        };

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let trivia_api_url = env::var("TRIVIA_API_URL")
            .unwrap_or_else(|_| DEFAULT_TRIVIA_API_URL.to_string());
        let trivia_api_url = parse_base_url(&trivia_api_url)
            .map_err(|e| ConfigError::Invalid("TRIVIA_API_URL", e))?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            port,
            rust_log,
            trivia_api_url,
            cors_origins,
        })
    }

    /// Whether the configured store is the in-process one.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory:")
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

/// Parses an upstream base URL, forcing a trailing slash so that relative
/// joins (`api.php`) keep any path prefix.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
