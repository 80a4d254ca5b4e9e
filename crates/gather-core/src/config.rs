//! Configuration module
//!
//! This module provides configuration for the intake and export engines,
//! including database, storage, naming and reminder settings.

use std::env;

use crate::naming::{self, DEFAULT_NAMING_FORMAT};
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_FILE_SIZE_MB: usize = 100;
const REMINDER_INTERVAL_SECS: u64 = 600;
const REMINDER_COOLDOWN_SECS: u64 = 3600;
const LOCAL_STORAGE_PATH: &str = "./uploads";

/// Database settings shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// Intake, export and reminder settings
#[derive(Clone, Debug)]
pub struct GatherConfig {
    pub base: BaseConfig,
    pub storage_backend: StorageBackend,
    pub local_storage_path: String,
    pub max_file_size_bytes: usize,
    pub default_naming_format: String,
    pub reminder_interval_secs: u64,
    pub reminder_cooldown_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<GatherConfig>);

impl Config {
    fn inner(&self) -> &GatherConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = GatherConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn database_url(&self) -> &str {
        &self.inner().base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.inner().base.environment
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn local_storage_path(&self) -> &str {
        &self.inner().local_storage_path
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.inner().max_file_size_bytes
    }

    pub fn default_naming_format(&self) -> &str {
        &self.inner().default_naming_format
    }

    pub fn reminder_interval_secs(&self) -> u64 {
        self.inner().reminder_interval_secs
    }

    pub fn reminder_cooldown_secs(&self) -> u64 {
        self.inner().reminder_cooldown_secs
    }
}

impl GatherConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let base = BaseConfig {
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<StorageBackend>()?;

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);

        Ok(GatherConfig {
            base,
            storage_backend,
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or_else(|_| LOCAL_STORAGE_PATH.to_string()),
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            default_naming_format: env::var("DEFAULT_NAMING_FORMAT")
                .unwrap_or_else(|_| DEFAULT_NAMING_FORMAT.to_string()),
            reminder_interval_secs: env::var("REMINDER_INTERVAL_SECS")
                .unwrap_or_else(|_| REMINDER_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(REMINDER_INTERVAL_SECS),
            reminder_cooldown_secs: env::var("REMINDER_COOLDOWN_SECS")
                .unwrap_or_else(|_| REMINDER_COOLDOWN_SECS.to_string())
                .parse()
                .unwrap_or(REMINDER_COOLDOWN_SECS),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.base.database_url.starts_with("postgresql://")
            && !self.base.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.base.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be greater than 0"));
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if let Err(msg) = naming::validate(&self.default_naming_format) {
            return Err(anyhow::anyhow!("DEFAULT_NAMING_FORMAT is invalid: {}", msg));
        }

        if self.reminder_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "REMINDER_INTERVAL_SECS must be greater than 0"
            ));
        }

        match self.storage_backend {
            StorageBackend::Local => {
                if self.local_storage_path.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
