//! Service configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Which [`Store`](examprep_store::Store) implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `DATABASE_URL`.
    Postgres,
    /// In-process tables; state is lost on restart.
    Memory,
    /// `RocksDB` under `DATA_DIR` (feature `rocksdb-backend`).
    RocksDb,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Some(Self::Postgres),
            "memory" => Some(Self::Memory),
            "rocksdb" | "rocks" => Some(Self::RocksDb),
            _ => None,
        }
    }
}

/// One-time password settings.
#[derive(Debug, Clone)]
pub struct OtpSettings {
    /// Number of digits in a code.
    pub length: usize,
    /// How long a code stays valid.
    pub ttl: Duration,
    /// Wrong guesses allowed before the code is burned.
    pub max_attempts: u32,
    /// Codes a user may request per `generation_window`.
    pub max_generations: usize,
    /// Sliding window for `max_generations`.
    pub generation_window: Duration,
    /// Echo the code in the API response. Development only.
    pub expose_code: bool,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            length: 6,
            ttl: Duration::from_secs(10 * 60),
            max_attempts: 3,
            max_generations: 3,
            generation_window: Duration::from_secs(15 * 60),
            expose_code: false,
        }
    }
}

/// Paper generation worker settings.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Attempts per job before the credit is refunded.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub initial_backoff: Duration,
    /// Upper bound for the retry delay.
    pub max_backoff: Duration,
    /// Capacity of the job queue.
    pub queue_capacity: usize,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            queue_capacity: 256,
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Storage backend (default: postgres when `DATABASE_URL` is set, memory otherwise).
    pub store_backend: StoreBackend,

    /// PostgreSQL connection string.
    pub database_url: Option<String>,

    /// Maximum pooled PostgreSQL connections.
    pub database_max_connections: u32,

    /// Path to the `RocksDB` data directory (default: "/data/examprep").
    pub data_dir: String,

    /// Secret for signing HS256 access and refresh tokens.
    pub jwt_secret: String,

    /// Lifetime of access tokens.
    pub access_token_ttl: Duration,

    /// Lifetime of refresh tokens.
    pub refresh_token_ttl: Duration,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Admin API key for privileged endpoints.
    pub admin_api_key: Option<String>,

    /// Razorpay key id (optional).
    pub razorpay_key_id: Option<String>,

    /// Razorpay webhook secret (optional). Signatures are only checked when set.
    pub razorpay_webhook_secret: Option<String>,

    /// OTP settings.
    pub otp: OtpSettings,

    /// Question generator endpoint. A built-in sample generator is used when unset.
    pub generator_url: Option<String>,

    /// Endpoint notified when a user's balance drops to the low-credit threshold.
    pub low_credit_webhook_url: Option<String>,

    /// Paper generation worker settings.
    pub worker: WorkerSettings,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Maximum concurrent requests on the `/v1` routes.
    pub max_concurrent_requests: usize,
}

/// Razorpay secrets file structure.
#[derive(Debug, Deserialize)]
struct RazorpaySecrets {
    #[serde(default)]
    key_id: Option<String>,
    #[serde(default)]
    webhook_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let database_url = std::env::var("DATABASE_URL").ok();
        let store_backend = std::env::var("STORE_BACKEND")
            .ok()
            .and_then(|s| StoreBackend::parse(&s))
            .unwrap_or(if database_url.is_some() {
                StoreBackend::Postgres
            } else {
                StoreBackend::Memory
            });

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set - using an insecure development secret");
            defaults.jwt_secret.clone()
        });

        // Try to load Razorpay secrets from file first, then fall back to env vars
        let (razorpay_key_id, razorpay_webhook_secret) = load_razorpay_secrets();

        let otp = OtpSettings {
            length: env_parse("OTP_LENGTH").unwrap_or(defaults.otp.length),
            ttl: env_parse("OTP_EXPIRES_IN_MINUTES")
                .map_or(defaults.otp.ttl, |m: u64| Duration::from_secs(m * 60)),
            max_attempts: env_parse("OTP_MAX_ATTEMPTS").unwrap_or(defaults.otp.max_attempts),
            expose_code: env_parse("OTP_EXPOSE_CODE").unwrap_or(false),
            ..defaults.otp
        };

        let worker = WorkerSettings {
            max_attempts: env_parse("GENERATION_MAX_ATTEMPTS")
                .unwrap_or(defaults.worker.max_attempts),
            initial_backoff: env_parse("GENERATION_BACKOFF_MS")
                .map_or(defaults.worker.initial_backoff, Duration::from_millis),
            ..defaults.worker
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            store_backend,
            database_url,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/examprep".into()),
            jwt_secret,
            access_token_ttl: env_parse("ACCESS_TOKEN_TTL_SECONDS")
                .map_or(defaults.access_token_ttl, Duration::from_secs),
            refresh_token_ttl: env_parse("REFRESH_TOKEN_TTL_SECONDS")
                .map_or(defaults.refresh_token_ttl, Duration::from_secs),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            razorpay_key_id,
            razorpay_webhook_secret,
            otp,
            generator_url: std::env::var("GENERATOR_URL").ok(),
            low_credit_webhook_url: std::env::var("LOW_CREDIT_WEBHOOK_URL").ok(),
            worker,
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS").unwrap_or(30),
            max_concurrent_requests: env_parse("MAX_CONCURRENT_REQUESTS").unwrap_or(100),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Load Razorpay secrets from file or environment.
fn load_razorpay_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/razorpay.json",
        "examprep/.secrets/razorpay.json",
        "../.secrets/razorpay.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<RazorpaySecrets>(path) {
            tracing::info!(path = %path, "Loaded Razorpay secrets from file");
            return (secrets.key_id, secrets.webhook_secret);
        }
    }

    tracing::debug!("Razorpay secrets file not found, using environment variables");
    (
        std::env::var("RAZORPAY_KEY_ID").ok(),
        std::env::var("RAZORPAY_WEBHOOK_SECRET").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_max_connections: 10,
            data_dir: "/data/examprep".into(),
            jwt_secret: "examprep-development-secret".into(),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            service_api_key: None,
            admin_api_key: None,
            razorpay_key_id: None,
            razorpay_webhook_secret: None,
            otp: OtpSettings::default(),
            generator_url: None,
            low_credit_webhook_url: None,
            worker: WorkerSettings::default(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            max_concurrent_requests: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_backend_parsing() {
        assert_eq!(StoreBackend::parse("Postgres"), Some(StoreBackend::Postgres));
        assert_eq!(StoreBackend::parse("memory"), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse("rocksdb"), Some(StoreBackend::RocksDb));
        assert_eq!(StoreBackend::parse("mysql"), None);
    }

    #[test]
    fn defaults_match_documented_limits() {
        let config = ServiceConfig::default();
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(604_800));
        assert_eq!(config.otp.length, 6);
        assert_eq!(config.otp.max_attempts, 3);
        assert_eq!(config.worker.max_attempts, 3);
        assert_eq!(config.worker.initial_backoff, Duration::from_millis(500));
        assert_eq!(config.worker.max_backoff, Duration::from_secs(10));
    }

    #[test]
    fn missing_secrets_file_is_not_found() {
        let err = load_secrets_file::<RazorpaySecrets>("does/not/exist.json").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
