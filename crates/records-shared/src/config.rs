//! Configuration management

use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_IP_RETENTION_DAYS, DEFAULT_MAX_PRINT_RETRIES, DEFAULT_POLL_INTERVAL_SECONDS,
    DEFAULT_PRINT_BATCH_SIZE, DEFAULT_STALE_CLAIM_SECONDS, DEFAULT_USER_AGENT_RETENTION_DAYS,
};
use crate::error::AppError;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub worker: WorkerSettings,
    pub retention: RetentionSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub env: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerSettings {
    pub poll_interval_seconds: u64,
    pub batch_size: usize,
    pub max_retries: i32,
    pub stale_after_seconds: u64,
    pub output_root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetentionSettings {
    pub client_ip_days: i64,
    pub user_agent_days: i64,
    pub collect_client_ip: bool,
    pub collect_user_agent: bool,
}

impl AppConfig {
    /// Load from `config/default`, `config/{APP_ENV}` and `APP_*` environment variables.
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let config = Config::builder()
            .set_default("app.env", "development")?
            .set_default("app.name", "records-worker")?
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_seconds", 3)?
            .set_default("worker.poll_interval_seconds", DEFAULT_POLL_INTERVAL_SECONDS)?
            .set_default("worker.batch_size", DEFAULT_PRINT_BATCH_SIZE as u64)?
            .set_default("worker.max_retries", DEFAULT_MAX_PRINT_RETRIES)?
            .set_default("worker.stale_after_seconds", DEFAULT_STALE_CLAIM_SECONDS)?
            .set_default("worker.output_root", "output/contracts")?
            .set_default("retention.client_ip_days", DEFAULT_IP_RETENTION_DAYS)?
            .set_default("retention.user_agent_days", DEFAULT_USER_AGENT_RETENTION_DAYS)?
            .set_default("retention.collect_client_ip", true)?
            .set_default("retention.collect_user_agent", true)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Example: APP_DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: AppConfig = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::InvalidConfig("database.url is empty".into()));
        }
        if self.worker.batch_size == 0 {
            return Err(AppError::InvalidConfig("worker.batch_size must be greater than 0".into()));
        }
        if self.worker.poll_interval_seconds == 0 {
            return Err(AppError::InvalidConfig(
                "worker.poll_interval_seconds must be greater than 0".into(),
            ));
        }
        if self.worker.max_retries < 0 {
            return Err(AppError::InvalidConfig("worker.max_retries must not be negative".into()));
        }
        if self.retention.client_ip_days < 0 || self.retention.user_agent_days < 0 {
            return Err(AppError::InvalidConfig("retention days must not be negative".into()));
        }
        Ok(())
    }
}
