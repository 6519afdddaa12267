// Daemon configuration from SHIFTLINE_* environment variables

use anyhow::{anyhow, Context, Result};
use shiftline_core::EngineConfig;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "~/.shiftline/shiftline.db";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// sqlx connection URL
    pub database_url: String,
    pub poll_interval: Duration,
    pub log_format: String,
    pub log_dir: Option<String>,
    pub engine: EngineConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("SHIFTLINE_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let database_url = database_url(&db_path)?;

        let mut engine = EngineConfig::default();
        if let Some(pct) = parse::<f64>(&lookup, "SHIFTLINE_PLATFORM_PERCENTAGE")? {
            engine.platform_percentage = pct;
        }
        if let Some(attempts) = parse::<i32>(&lookup, "SHIFTLINE_TASK_MAX_ATTEMPTS")? {
            engine.task_max_attempts = attempts;
        }
        engine
            .validate()
            .map_err(|e| anyhow!("invalid engine configuration: {}", e))?;

        let poll_interval_ms =
            parse::<u64>(&lookup, "SHIFTLINE_POLL_INTERVAL_MS")?.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(anyhow!("SHIFTLINE_POLL_INTERVAL_MS must be positive"));
        }

        Ok(Self {
            database_url,
            poll_interval: Duration::from_millis(poll_interval_ms),
            log_format: lookup("SHIFTLINE_LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            log_dir: lookup("SHIFTLINE_LOG_DIR").map(|dir| shellexpand::tilde(&dir).into_owned()),
            engine,
        })
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: {:?}", key, raw))
        })
        .transpose()
}

/// `sqlite:` URLs pass through; plain paths are expanded and turned into one.
fn database_url(db_path: &str) -> Result<String> {
    if db_path.starts_with("sqlite:") {
        return Ok(db_path.to_string());
    }
    let expanded = shellexpand::full(db_path)
        .with_context(|| format!("cannot expand SHIFTLINE_DB_PATH {:?}", db_path))?;
    if let Some(parent) = std::path::Path::new(expanded.as_ref()).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create database directory {}", parent.display()))?;
        }
    }
    Ok(format!("sqlite://{}", expanded))
}
