//! Configuration module
//!
//! Env-var driven configuration for the API and services: database, storage
//! backend, upload limits, signed-URL TTLs, and anomaly detection settings.

use std::env;

use crate::storage_types::StorageBackend;

// Defaults
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: usize = 100;
const SIGNED_URL_TTL_SECS: u64 = 3600;
const SIGNED_URL_MAX_TTL_SECS: u64 = 86400;
const UPLOAD_SESSION_TTL_SECS: u64 = 3600;
const UPLOAD_SESSION_SWEEP_INTERVAL_SECS: u64 = 300;
const ANOMALY_WINDOW_SECS: u64 = 300;
const ANOMALY_THRESHOLD: i64 = 20;
const GRANT_DEFAULT_EXPIRY_DAYS: i64 = 30;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Secret for signing upload tokens (HMAC-SHA256)
    pub upload_token_secret: String,
    pub max_upload_size_bytes: usize,
    pub signed_url_ttl_secs: u64,
    pub signed_url_max_ttl_secs: u64,
    pub upload_session_ttl_secs: u64,
    /// Interval between expired-session sweeps. 0 = disabled (lazy expiry only).
    pub upload_session_sweep_interval_secs: u64,
    pub anomaly_window_secs: u64,
    pub anomaly_threshold: i64,
    /// When true, suspicious principals are hard-denied instead of just flagged.
    pub anomaly_enforce: bool,
    pub grant_default_expiry_days: i64,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .unwrap_or_else(|_| MAX_UPLOAD_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let storage_backend =
            env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|s| match s.to_lowercase().as_str() {
                    "s3" => Some(StorageBackend::S3),
                    "local" => Some(StorageBackend::Local),
                    _ => None,
                });

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            database_url: env::var("COURSEVAULT_DATABASE_URL")
                .or_else(|_| env::var("DATABASE_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("COURSEVAULT_DATABASE_URL or DATABASE_URL must be set")
                })?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            upload_token_secret: env::var("UPLOAD_TOKEN_SECRET").map_err(|_| {
                anyhow::anyhow!("UPLOAD_TOKEN_SECRET must be set for upload token signing")
            })?,
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            signed_url_ttl_secs: env::var("SIGNED_URL_TTL_SECS")
                .unwrap_or_else(|_| SIGNED_URL_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_TTL_SECS),
            signed_url_max_ttl_secs: env::var("SIGNED_URL_MAX_TTL_SECS")
                .unwrap_or_else(|_| SIGNED_URL_MAX_TTL_SECS.to_string())
                .parse()
                .unwrap_or(SIGNED_URL_MAX_TTL_SECS),
            upload_session_ttl_secs: env::var("UPLOAD_SESSION_TTL_SECS")
                .unwrap_or_else(|_| UPLOAD_SESSION_TTL_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_SESSION_TTL_SECS),
            upload_session_sweep_interval_secs: env::var("UPLOAD_SESSION_SWEEP_INTERVAL_SECS")
                .unwrap_or_else(|_| UPLOAD_SESSION_SWEEP_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(UPLOAD_SESSION_SWEEP_INTERVAL_SECS),
            anomaly_window_secs: env::var("ANOMALY_WINDOW_SECS")
                .unwrap_or_else(|_| ANOMALY_WINDOW_SECS.to_string())
                .parse()
                .unwrap_or(ANOMALY_WINDOW_SECS),
            anomaly_threshold: env::var("ANOMALY_THRESHOLD")
                .unwrap_or_else(|_| ANOMALY_THRESHOLD.to_string())
                .parse()
                .unwrap_or(ANOMALY_THRESHOLD),
            anomaly_enforce: env::var("ANOMALY_ENFORCE")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(false),
            grant_default_expiry_days: env::var("GRANT_DEFAULT_EXPIRY_DAYS")
                .unwrap_or_else(|_| GRANT_DEFAULT_EXPIRY_DAYS.to_string())
                .parse()
                .unwrap_or(GRANT_DEFAULT_EXPIRY_DAYS),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.upload_token_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "UPLOAD_TOKEN_SECRET must be at least 32 characters long"
            ));
        }

        if !self.database_url.starts_with("postgresql://")
            && !self.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "COURSEVAULT_DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.signed_url_ttl_secs > self.signed_url_max_ttl_secs {
            return Err(anyhow::anyhow!(
                "SIGNED_URL_TTL_SECS cannot exceed SIGNED_URL_MAX_TTL_SECS"
            ));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
