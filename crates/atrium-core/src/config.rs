//! Configuration module
//!
//! Configuration for the file store and the visual page store: where the public
//! static root lives, the upload size limit and the optional Postgres connection
//! used by the page persistence collaborator.

use std::env;
use std::path::{Path, PathBuf};

// Common constants
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: u64 = 50;
const UPLOAD_SIZE_CEILING_MB: u64 = 1024;
const PUBLIC_ROOT: &str = "public";

/// Base configuration shared by every entrypoint
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub environment: String,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

/// Content storage configuration
#[derive(Clone, Debug)]
pub struct ContentConfig {
    pub base: BaseConfig,
    /// Public static root; scope roots live at `{public_root}/{scope}/files`
    pub public_root: PathBuf,
    pub max_upload_size_bytes: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<ContentConfig>);

impl Config {
    fn as_content(&self) -> &ContentConfig {
        &self.0
    }

    pub fn new(config: ContentConfig) -> Self {
        Config(Box::new(config))
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.as_content().base.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = ContentConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_content().validate()
    }

    pub fn environment(&self) -> &str {
        &self.as_content().base.environment
    }

    pub fn public_root(&self) -> &Path {
        &self.as_content().public_root
    }

    pub fn max_upload_size_bytes(&self) -> u64 {
        self.as_content().max_upload_size_bytes
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_content().base.database_url.as_deref()
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_content().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_content().base.db_timeout_seconds
    }
}

impl ContentConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let base = BaseConfig {
            environment,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
        };

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<u64>()
            .map_err(|_| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be a valid number"))?;
        let max_upload_size_bytes = upload_limit_bytes(max_upload_size_mb)?;

        let config = ContentConfig {
            base,
            public_root: PathBuf::from(
                env::var("PUBLIC_ROOT").unwrap_or_else(|_| PUBLIC_ROOT.to_string()),
            ),
            max_upload_size_bytes,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.public_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("PUBLIC_ROOT must not be empty"));
        }

        if self.max_upload_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.max_upload_size_bytes > UPLOAD_SIZE_CEILING_MB * 1024 * 1024 {
            return Err(anyhow::anyhow!(
                "MAX_UPLOAD_SIZE_MB must not exceed {}",
                UPLOAD_SIZE_CEILING_MB
            ));
        }

        if let Some(url) = &self.base.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        Ok(())
    }
}

/// Convert the configured limit in MiB to bytes, rejecting values above the ceiling.
fn upload_limit_bytes(megabytes: u64) -> Result<u64, anyhow::Error> {
    if megabytes > UPLOAD_SIZE_CEILING_MB {
        return Err(anyhow::anyhow!(
            "MAX_UPLOAD_SIZE_MB must not exceed {}",
            UPLOAD_SIZE_CEILING_MB
        ));
    }
    megabytes
        .checked_mul(1024 * 1024)
        .ok_or_else(|| anyhow::anyhow!("MAX_UPLOAD_SIZE_MB is out of range"))
}

impl Default for ContentConfig {
    fn default() -> Self {
        ContentConfig {
            base: BaseConfig {
                environment: "development".to_string(),
                database_url: None,
                db_max_connections: MAX_CONNECTIONS,
                db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            },
            public_root: PathBuf::from(PUBLIC_ROOT),
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limit_is_fifty_mebibytes() {
        let config = Config::new(ContentConfig::default());
        assert_eq!(config.max_upload_size_bytes(), 50 * 1024 * 1024);
        assert!(config.validate().is_ok());
        assert!(!config.is_production());
    }

    #[test]
    fn upload_limit_is_converted_to_bytes() {
        assert_eq!(upload_limit_bytes(50).unwrap(), 50 * 1024 * 1024);
        assert_eq!(
            upload_limit_bytes(UPLOAD_SIZE_CEILING_MB).unwrap(),
            UPLOAD_SIZE_CEILING_MB * 1024 * 1024
        );
    }

    #[test]
    fn oversized_upload_limit_is_an_error_not_an_overflow() {
        assert!(upload_limit_bytes(UPLOAD_SIZE_CEILING_MB + 1).is_err());
        assert!(upload_limit_bytes(u64::MAX).is_err());
        assert!(upload_limit_bytes(u64::MAX / 1024).is_err());
    }

    #[test]
    fn rejects_non_postgres_database_url() {
        let mut config = ContentConfig::default();
        config.base.database_url = Some("mysql://localhost/site".to_string());
        assert!(config.validate().is_err());

        config.base.database_url = Some("postgresql://localhost/site".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_upload_limit() {
        let config = ContentConfig {
            max_upload_size_bytes: 0,
            ..ContentConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
