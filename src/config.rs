use std::env;
use std::str::FromStr;

use anyhow::{Context, bail};
use dotenvy::dotenv;

/// Which backend holds attendance data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    MySql,
    /// Process-local tables, lost on restart.
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(StorageKind::MySql),
            "memory" => Ok(StorageKind::Memory),
            other => bail!("unknown storage backend '{other}' (expected mysql or memory)"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_addr: String,
    pub storage: StorageKind,

    // Rate limiting, 0 disables it
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub log_dir: String,
    pub log_level: tracing::Level,

    /// Seconds before an idle per-employee lock is dropped.
    pub lock_idle_secs: u64,
}

fn var_or<T>(key: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("{key}: invalid value '{raw}': {e}"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let storage: StorageKind = var_or("STORAGE", "mysql")?;
        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageKind::MySql && database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE=mysql");
        }

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").context("SERVER_ADDR must be set")?,
            database_url,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            storage,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", "1000")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: var_or("LOG_LEVEL", "debug")?,
            lock_idle_secs: var_or("LOCK_IDLE_SECS", "600")?,
        })
    }
}
