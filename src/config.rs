use std::env;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use chrono::NaiveTime;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageBackend {
    Mysql,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    pub storage_backend: StorageBackend,
    /// Only read when the backend is MySQL.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_register_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
    pub log_dir: String,
    pub log_level: tracing::Level,

    pub workday_start: NaiveTime,
    pub late_grace_minutes: u32,
    pub username_cache_warmup_days: u32,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let storage_backend: StorageBackend = parsed("STORAGE_BACKEND", "mysql")?;
        let database_url = match storage_backend {
            StorageBackend::Mysql => Some(required("DATABASE_URL")?),
            StorageBackend::Memory => env::var("DATABASE_URL").ok(),
        };

        let workday_start = env::var("WORKDAY_START").unwrap_or_else(|_| "09:00".to_string());
        let workday_start = NaiveTime::parse_from_str(&workday_start, "%H:%M")
            .with_context(|| format!("WORKDAY_START={workday_start:?} must be HH:MM"))?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            storage_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: parsed("ACCESS_TOKEN_TTL", "900")?, // 15 min
            refresh_token_ttl: parsed("REFRESH_TOKEN_TTL", "604800")?, // 7 days

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", "60")?,
            rate_register_per_min: parsed("RATE_REGISTER_PER_MIN", "30")?,
            rate_refresh_per_min: parsed("RATE_REFRESH_PER_MIN", "30")?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: parsed("LOG_LEVEL", "debug")?,

            workday_start,
            late_grace_minutes: parsed("LATE_GRACE_MINUTES", "15")?,
            username_cache_warmup_days: parsed("USERNAME_CACHE_WARMUP_DAYS", "30")?,
        })
    }
}
