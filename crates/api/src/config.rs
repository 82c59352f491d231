use std::time::Duration;

use civic_core::chart::DEFAULT_DISPLAY_TIMEZONE;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT validation settings.
    pub jwt: JwtConfig,
    /// Base URL that stored asset keys (`pdf_info`) are joined onto.
    pub asset_base_url: String,
    /// IANA timezone used to bucket chart timestamps.
    pub chart_timezone: String,
    /// Calls slower than this are logged at `warn`.
    pub slow_call_threshold_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                        |
    /// |--------------------------|--------------------------------|
    /// | `HOST`                   | `0.0.0.0`                      |
    /// | `PORT`                   | `3000`                         |
    /// | `CORS_ORIGINS`           | `http://localhost:5173`        |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                           |
    /// | `ASSET_BASE_URL`         | `http://localhost:9000/assets` |
    /// | `CHART_TIMEZONE`         | `Asia/Tokyo`                   |
    /// | `SLOW_CALL_THRESHOLD_MS` | `500`                          |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let asset_base_url = std::env::var("ASSET_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:9000/assets".into());

        let chart_timezone =
            std::env::var("CHART_TIMEZONE").unwrap_or_else(|_| DEFAULT_DISPLAY_TIMEZONE.into());

        let slow_call_threshold_ms: u64 = std::env::var("SLOW_CALL_THRESHOLD_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("SLOW_CALL_THRESHOLD_MS must be a valid u64");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt,
            asset_base_url,
            chart_timezone,
            slow_call_threshold_ms,
        }
    }

    pub fn slow_call_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_call_threshold_ms)
    }
}
