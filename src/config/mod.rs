/// Application configuration module
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

use crate::errors::ConfigError;

pub const DEFAULT_NOAA_BASE_URL: &str = "https://services.swpc.noaa.gov";
pub const DEFAULT_NWS_BASE_URL: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "rust-aurora/0.1 (aurora visibility service)";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub locations_file: Option<PathBuf>,
    pub upstream: UpstreamConfig,
}

/// Where and how the upstream feeds are reached
#[derive(Clone, Debug)]
pub struct UpstreamConfig {
    pub noaa_base_url: String,
    pub nws_base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// How long an hourly NWS forecast is reused
    pub forecast_ttl: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            noaa_base_url: DEFAULT_NOAA_BASE_URL.to_string(),
            nws_base_url: DEFAULT_NWS_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
            forecast_ttl: Duration::from_secs(1800),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                let err = ConfigError::InvalidEnv {
                    key: "BIND_ADDR",
                    reason: e.to_string(),
                };
                error!(error = %err, "configuration rejected");
                err
            })?;

        let locations_file = env::var("LOCATIONS_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let defaults = UpstreamConfig::default();
        let upstream = UpstreamConfig {
            noaa_base_url: env_string("NOAA_BASE_URL", &defaults.noaa_base_url),
            nws_base_url: env_string("NWS_BASE_URL", &defaults.nws_base_url),
            user_agent: env_string("UPSTREAM_USER_AGENT", &defaults.user_agent),
            timeout: Duration::from_secs(env_u64("HTTP_TIMEOUT_SECONDS", 30)),
            forecast_ttl: Duration::from_secs(env_u64("NWS_FORECAST_TTL_SECONDS", 1800)),
        };

        Ok(Self {
            bind_addr,
            locations_file,
            upstream,
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
