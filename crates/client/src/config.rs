//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VENDOR_API_BASE_URL` - Base URL of the vendor REST API (e.g., `https://api.example.com/api/`)
//!
//! ## Optional
//! - `VENDOR_API_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `VENDOR_CACHE_STALE_AFTER_SECS` - Age after which cached reads refresh in the background (default: 60)
//! - `VENDOR_CACHE_TTL_SECS` - Age after which cached entries are evicted (default: 300)
//! - `VENDOR_CACHE_MAX_ENTRIES` - Maximum number of cached query results (default: 1000)
//! - `VENDOR_SESSION_FILE` - Where the persisted session blob lives (default: `.vendor-portal/session.json`)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_STALE_AFTER_SECS: u64 = 60;
const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_MAX_ENTRIES: u64 = 1000;
const DEFAULT_SESSION_FILE: &str = ".vendor-portal/session.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Complete client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// Resource cache tuning
    pub cache: CacheConfig,
    /// Location of the persisted session blob
    pub session_file: PathBuf,
}

/// Vendor REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL, always ending in `/` so relative paths join beneath it
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Resource cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Entries older than this are served once more and refreshed in the background
    pub stale_after: Duration,
    /// Entries older than this are evicted outright
    pub time_to_live: Duration,
    /// Upper bound on cached query results
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            time_to_live: Duration::from_secs(DEFAULT_TTL_SECS),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api = ApiConfig {
            base_url: ApiConfig::parse_base_url(&get_required_env("VENDOR_API_BASE_URL")?)
                .map_err(|e| {
                    ConfigError::InvalidEnvVar("VENDOR_API_BASE_URL".to_string(), e)
                })?,
            timeout: Duration::from_secs(get_parsed_env(
                "VENDOR_API_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )?),
        };

        let cache = CacheConfig {
            stale_after: Duration::from_secs(get_parsed_env(
                "VENDOR_CACHE_STALE_AFTER_SECS",
                DEFAULT_STALE_AFTER_SECS,
            )?),
            time_to_live: Duration::from_secs(get_parsed_env(
                "VENDOR_CACHE_TTL_SECS",
                DEFAULT_TTL_SECS,
            )?),
            max_entries: get_parsed_env("VENDOR_CACHE_MAX_ENTRIES", DEFAULT_MAX_ENTRIES)?,
        };

        let session_file =
            PathBuf::from(get_env_or_default("VENDOR_SESSION_FILE", DEFAULT_SESSION_FILE));

        Ok(Self {
            api,
            cache,
            session_file,
        })
    }
}

impl ApiConfig {
    /// Build an API configuration from a base URL string with default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error message if the URL does not parse or is not http(s).
    pub fn new(base_url: &str) -> Result<Self, String> {
        Ok(Self {
            base_url: Self::parse_base_url(base_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse_base_url(raw: &str) -> Result<Url, String> {
        let mut normalized = raw.trim().to_string();
        if !normalized.ends_with('/') {
            normalized.push('/');
        }
        let url = Url::parse(&normalized).map_err(|e| e.to_string())?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }
        Ok(url)
    }

    /// Resolve a media path returned by the API (profile picture, product
    /// image) to an absolute URL.
    ///
    /// Absolute URLs are returned unchanged. Relative paths resolve against
    /// the API origin, not the `/api/` prefix, because uploads are served
    /// from the server root.
    #[must_use]
    pub fn asset_url(&self, path: &str) -> Option<Url> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        if let Ok(absolute) = Url::parse(path) {
            return Some(absolute);
        }
        let mut origin = self.base_url.clone();
        origin.set_path("/");
        origin.join(path.trim_start_matches('/')).ok()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an environment variable parsed into `T`, falling back to `default` when unset.
fn get_parsed_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ApiConfig::new("https://api.example.com/api").unwrap();
        assert_eq!(config.base_url.as_str(), "https://api.example.com/api/");
        assert_eq!(
            config.base_url.join("vendor/products").unwrap().as_str(),
            "https://api.example.com/api/vendor/products"
        );
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(ApiConfig::new("ftp://example.com/").is_err());
        assert!(ApiConfig::new("not a url").is_err());
    }

    #[test]
    fn test_asset_url_resolves_against_origin() {
        let config = ApiConfig::new("http://127.0.0.1:9078/api/").unwrap();
        assert_eq!(
            config.asset_url("uploads/avatar.png").unwrap().as_str(),
            "http://127.0.0.1:9078/uploads/avatar.png"
        );
        assert_eq!(
            config.asset_url("/uploads/avatar.png").unwrap().as_str(),
            "http://127.0.0.1:9078/uploads/avatar.png"
        );
        assert_eq!(
            config
                .asset_url("https://cdn.example.com/a.png")
                .unwrap()
                .as_str(),
            "https://cdn.example.com/a.png"
        );
        assert!(config.asset_url("  ").is_none());
    }

    #[test]
    fn test_cache_config_defaults() {
        let cache = CacheConfig::default();
        assert_eq!(cache.stale_after, Duration::from_secs(60));
        assert_eq!(cache.time_to_live, Duration::from_secs(300));
        assert_eq!(cache.max_entries, 1000);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingEnvVar("VENDOR_API_BASE_URL".to_string());
        assert_eq!(
            err.to_string(),
            "Missing environment variable: VENDOR_API_BASE_URL"
        );
    }
}
