//! Runtime configuration, read once from the environment at startup.

use log::{info, warn};
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_MAX_ROWS: usize = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub max_upload_bytes: usize,
    pub max_rows: usize,
    pub open_browser: bool,
    /// Required in `x-admin-token` for admin routes. Unset disables them.
    pub admin_token: Option<String>,
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    /// Endpoint speaking the `?location=` protocol. `None` means Nominatim.
    pub url: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
    pub concurrency: usize,
    pub retries: u32,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            url: None,
            user_agent: "community_mapper".to_string(),
            timeout: Duration::from_secs(10),
            concurrency: 1,
            retries: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            db_path: PathBuf::from("community_map.sqlite"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_rows: DEFAULT_MAX_ROWS,
            open_browser: false,
            admin_token: None,
            geocoder: GeocoderConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid value for {key}: {reason}")]
pub struct ConfigError {
    key: &'static str,
    reason: String,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let geocoder = GeocoderConfig {
            url: optional("GEOCODER_URL"),
            user_agent: try_load("GEOCODER_USER_AGENT", defaults.geocoder.user_agent)?,
            timeout: Duration::from_secs(try_load("GEOCODER_TIMEOUT_SECS", 10u64)?),
            concurrency: try_load("GEOCODER_CONCURRENCY", defaults.geocoder.concurrency)?
                .max(1),
            retries: try_load("GEOCODER_RETRIES", defaults.geocoder.retries)?,
        };

        Ok(Self {
            host: try_load("MAPPER_HOST", defaults.host)?,
            port: try_load("MAPPER_PORT", defaults.port)?,
            db_path: PathBuf::from(try_load(
                "MAPPER_DB_PATH",
                defaults.db_path.display().to_string(),
            )?),
            max_upload_bytes: try_load("MAPPER_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            max_rows: try_load("MAPPER_MAX_ROWS", defaults.max_rows)?,
            open_browser: try_load("MAPPER_OPEN_BROWSER", defaults.open_browser)?,
            admin_token: optional("MAPPER_ADMIN_TOKEN"),
            geocoder,
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError {
                key,
                reason: e.to_string(),
            }
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
