use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted backend endpoint and key.
    pub backend: BackendConfig,
    /// Local session storage.
    pub storage: StorageConfig,
    /// Log filter and output format.
    pub logging: LoggingConfig,
    /// Timeouts for backend calls.
    pub request: RequestConfig,
    /// Aggregate row limits.
    pub dashboard: DashboardConfig,
}

/// Hosted analytics backend configuration
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the hosted backend (`BACKEND_URL`).
    pub base_url: String,
    /// Public anonymous API key (`BACKEND_ANON_KEY`).
    pub anon_key: String,
}

/// Durable client storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// SQLite database file (`STORAGE_PATH`).
    pub path: PathBuf,
    /// Pool size (`STORAGE_MAX_CONNECTIONS`).
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default filter directive (`LOG_LEVEL`).
    pub level: String,
    /// Output format (`LOG_FORMAT`).
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Upper bound for a single backend call (`REQUEST_TIMEOUT_MS`).
    pub timeout_ms: u64,
}

/// Row limits for the dashboard aggregate reads
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// Daily rows (`DASHBOARD_DAILY_LIMIT`).
    pub daily_limit: u32,
    /// Weekly rows (`DASHBOARD_WEEKLY_LIMIT`).
    pub weekly_limit: u32,
    /// Monthly rows (`DASHBOARD_MONTHLY_LIMIT`).
    pub monthly_limit: u32,
    /// Top pages (`DASHBOARD_PAGES_LIMIT`).
    pub pages_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let backend = BackendConfig {
            base_url: env::var("BACKEND_URL").map_err(|_| AppError::Config {
                message: "BACKEND_URL is required".to_string(),
            })?,
            anon_key: env::var("BACKEND_ANON_KEY").map_err(|_| AppError::Config {
                message: "BACKEND_ANON_KEY is required".to_string(),
            })?,
        };

        let storage = StorageConfig {
            path: PathBuf::from(
                env::var("STORAGE_PATH").unwrap_or_else(|_| "./data/client.db".to_string()),
            ),
            max_connections: parse_var("STORAGE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_var("REQUEST_TIMEOUT_MS").unwrap_or(10_000),
        };

        let defaults = DashboardConfig::default();
        let dashboard = DashboardConfig {
            daily_limit: parse_var("DASHBOARD_DAILY_LIMIT").unwrap_or(defaults.daily_limit),
            weekly_limit: parse_var("DASHBOARD_WEEKLY_LIMIT").unwrap_or(defaults.weekly_limit),
            monthly_limit: parse_var("DASHBOARD_MONTHLY_LIMIT")
                .unwrap_or(defaults.monthly_limit),
            pages_limit: parse_var("DASHBOARD_PAGES_LIMIT").unwrap_or(defaults.pages_limit),
        };

        Ok(Config {
            backend,
            storage,
            logging,
            request,
            dashboard,
        })
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            daily_limit: 30,
            weekly_limit: 12,
            monthly_limit: 12,
            pages_limit: 10,
        }
    }
}
