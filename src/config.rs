//! Runtime configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `MENU_ADMIN_API_BASE` - Backend base URL, including the `/api` prefix
//!   (default: the production Railway deployment)
//! - `MENU_ADMIN_DATA_DIR` - Directory for the local store and logs
//!   (default: `<platform data dir>/menu-admin`)
//! - `MENU_ADMIN_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `MENU_ADMIN_REFRESH_SECS` - Dashboard auto-refresh period (default: 30)
//! - `MENU_ADMIN_REDIRECT_DELAY_MS` - Delay before the login redirect after a
//!   401 (default: 1500)
//! - `MENU_ADMIN_RECENT_ORDERS` - Recent orders shown on the dashboard
//!   (default: 15)
//!
//! A `.env` file in the working directory is loaded first when present.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::api::normalize_api_base;

pub const DEFAULT_API_BASE: &str = "https://backend-menu-production.up.railway.app/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REFRESH_SECS: u64 = 30;
const DEFAULT_REDIRECT_DELAY_MS: u64 = 1500;
const DEFAULT_RECENT_ORDERS: u32 = 15;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Normalized backend base URL, no trailing slash
    pub api_base: String,
    /// Directory holding `menu-admin.db` and `logs/`
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    pub refresh_interval: Duration,
    /// How long the "session expired" notice stays before the login redirect
    pub redirect_delay: Duration,
    pub recent_orders_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            data_dir: default_data_dir(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            redirect_delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
            recent_orders_limit: DEFAULT_RECENT_ORDERS,
        }
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_base = get("MENU_ADMIN_API_BASE")
            .map(|v| normalize_api_base(&v))
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let data_dir = get("MENU_ADMIN_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let timeout_secs: u64 =
            parse_or_default(get("MENU_ADMIN_TIMEOUT_SECS"), "MENU_ADMIN_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let refresh_secs: u64 =
            parse_or_default(get("MENU_ADMIN_REFRESH_SECS"), "MENU_ADMIN_REFRESH_SECS", DEFAULT_REFRESH_SECS)?;
        let redirect_ms: u64 = parse_or_default(
            get("MENU_ADMIN_REDIRECT_DELAY_MS"),
            "MENU_ADMIN_REDIRECT_DELAY_MS",
            DEFAULT_REDIRECT_DELAY_MS,
        )?;
        let recent_orders_limit: u32 = parse_or_default(
            get("MENU_ADMIN_RECENT_ORDERS"),
            "MENU_ADMIN_RECENT_ORDERS",
            DEFAULT_RECENT_ORDERS,
        )?;

        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MENU_ADMIN_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        if refresh_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "MENU_ADMIN_REFRESH_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base,
            data_dir,
            request_timeout: Duration::from_secs(timeout_secs),
            refresh_interval: Duration::from_secs(refresh_secs),
            redirect_delay: Duration::from_millis(redirect_ms),
            recent_orders_limit,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }
}

fn parse_or_default<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

/// Platform data directory joined with `menu-admin`.
pub fn default_data_dir() -> PathBuf {
    let base = std::env::var("LOCALAPPDATA")
        .or_else(|_| std::env::var("XDG_DATA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            #[cfg(target_os = "windows")]
            {
                PathBuf::from(std::env::var("USERPROFILE").unwrap_or_else(|_| ".".into()))
                    .join("AppData")
                    .join("Local")
            }
            #[cfg(not(target_os = "windows"))]
            {
                PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()))
                    .join(".local")
                    .join("share")
            }
        });
    base.join("menu-admin")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.redirect_delay, Duration::from_millis(1500));
        assert_eq!(config.recent_orders_limit, 15);
        assert!(config.data_dir.ends_with("menu-admin"));
    }

    #[test]
    fn test_overrides_are_parsed_and_normalized() {
        let config = AppConfig::from_lookup(lookup(&[
            ("MENU_ADMIN_API_BASE", "localhost:8000/api/"),
            ("MENU_ADMIN_DATA_DIR", "/tmp/menu-admin-test"),
            ("MENU_ADMIN_TIMEOUT_SECS", "5"),
            ("MENU_ADMIN_REFRESH_SECS", "10"),
            ("MENU_ADMIN_REDIRECT_DELAY_MS", "0"),
            ("MENU_ADMIN_RECENT_ORDERS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.api_base, "http://localhost:8000/api");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/menu-admin-test"));
        assert_eq!(config.log_dir(), PathBuf::from("/tmp/menu-admin-test/logs"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.refresh_interval, Duration::from_secs(10));
        assert_eq!(config.redirect_delay, Duration::ZERO);
        assert_eq!(config.recent_orders_limit, 3);
    }

    #[test]
    fn test_invalid_number_is_error() {
        let err = AppConfig::from_lookup(lookup(&[("MENU_ADMIN_REFRESH_SECS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "MENU_ADMIN_REFRESH_SECS"));
    }

    #[test]
    fn test_zero_refresh_is_error() {
        assert!(AppConfig::from_lookup(lookup(&[("MENU_ADMIN_REFRESH_SECS", "0")])).is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_process_environment() {
        // SAFETY: serialized with the other env-touching tests.
        std::env::set_var("MENU_ADMIN_RECENT_ORDERS", "7");
        let config = AppConfig::from_env().unwrap();
        std::env::remove_var("MENU_ADMIN_RECENT_ORDERS");
        assert_eq!(config.recent_orders_limit, 7);
    }
}
