//! Runtime configuration from CLI flags with environment fallback.
//!
//! # Environment Variables
//!
//! | Variable          | Default                    | Description                      |
//! |-------------------|----------------------------|----------------------------------|
//! | `API_TOKEN`       | (required)                 | Shared secret for `?token=`      |
//! | `DATABASE_URL`    | (required)                 | SQLite path or `:memory:`        |
//! | `HOST`            | `0.0.0.0`                  | Bind address                     |
//! | `PORT`            | `8080`                     | Listen port                      |
//! | `ENV`             | `production`               | `development` enables debug logs |
//! | `GEOIP_ENDPOINT`  | `https://api.ip.sb/geoip`  | Geo-ip API base URL              |
//! | `GEOIP_TIMEOUT`   | `10`                       | Geo-ip request timeout (seconds) |
//! | `REQUEST_TIMEOUT` | `30`                       | Per-request timeout (seconds)    |
//! | `CORS_ORIGINS`    | `*`                        | Comma separated allowed origins  |
//! | `LOG_JSON`        | `false`                    | Emit JSON log lines              |

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use tracing::warn;

use crate::adapters::geoip::DEFAULT_ENDPOINT;
use crate::http::HttpSettings;

pub const DEFAULT_PORT: u16 = 8080;

/// Snell panel server
#[derive(Debug, Clone, Parser)]
#[command(name = "snell-panel", version, about = "Manage Snell nodes and serve subscriptions")]
#[command(args_override_self = true)]
pub struct Config {
    /// Shared secret clients pass as the `token` query parameter
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// SQLite database location (`sqlite://path`, plain path, or `:memory:`)
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Bind address
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Listen port; invalid values fall back to 8080
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: String,

    /// Deployment environment
    #[arg(long = "env", env = "ENV", default_value = "production")]
    pub environment: String,

    /// Geo-ip API base URL
    #[arg(long, env = "GEOIP_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub geoip_endpoint: String,

    /// Geo-ip request timeout in seconds
    #[arg(long = "geoip-timeout", env = "GEOIP_TIMEOUT", default_value_t = 10)]
    pub geoip_timeout_secs: u64,

    /// Per-request timeout in seconds
    #[arg(long = "request-timeout", env = "REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Allowed CORS origins ("*" for any)
    #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub cors_origins: Vec<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    /// Parse process arguments, falling back to the environment.
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::Missing("API_TOKEN"));
        }
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.geoip_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("geoip timeout cannot be 0".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout("request timeout cannot be 0".into()));
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Listen port, falling back to [`DEFAULT_PORT`] on anything unparsable.
    pub fn listen_port(&self) -> u16 {
        match self.port.trim().parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => {
                warn!(value = %self.port, default = DEFAULT_PORT, "Invalid PORT value, using default");
                DEFAULT_PORT
            }
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.listen_port())
    }

    /// Database location with any `sqlite:` URL scheme removed.
    pub fn database_path(&self) -> &str {
        let url = self.database_url.trim();
        url.strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url)
    }

    pub fn geoip_timeout(&self) -> Duration {
        Duration::from_secs(self.geoip_timeout_secs)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            api_token: self.api_token.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            cors_origins: self.cors_origins.clone(),
            ..HttpSettings::default()
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
}
