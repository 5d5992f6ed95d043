//! Sync configuration loaded from environment variables and a store list.
//!
//! # Environment Variables
//!
//! ## Required
//! - `EXECUTION_TIME_INTERVAL` - Hours between runs; sets the recency window
//!
//! ## Optional
//! - `PRICESYNC_STORES_FILE` - Path to the YAML store list (default: stores.yaml)
//! - `SHOPIFY_API_VERSION` - Admin REST API version (default: 2021-07)
//! - `PRICESYNC_MAX_PAGES` - Listing pages followed per store (default: 40)
//! - `PRICESYNC_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)
//!
//! # Store list
//!
//! ```yaml
//! stores:
//!   - site_name: north-shop
//!     api_key: 4f1c9a...
//!     password: shppa_...
//! ```
//!
//! Each store holds private-app credentials (HIGH PRIVILEGE).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::shopify::{DEFAULT_API_VERSION, ShopCredentials, ShopifyError};
use crate::store::DEFAULT_MAX_PAGES;

const DEFAULT_STORES_FILE: &str = "stores.yaml";

/// Longest accepted run interval (one leap year).
pub const MAX_EXECUTION_INTERVAL_HOURS: u32 = 24 * 366;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("Cannot read store list {}: {source}", .path.display())]
    StoresFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Cannot parse store list: {0}")]
    StoresParse(#[from] serde_yaml::Error),
    #[error("Invalid store {0}: {1}")]
    InvalidStore(String, String),
}

/// Credentials and origin for one store.
///
/// Implements `Debug` manually to redact the HIGH PRIVILEGE password.
#[derive(Clone)]
pub struct StoreConfig {
    /// The `myshopify.com` subdomain
    pub site_name: String,
    /// Private app API key
    pub api_key: String,
    /// Private app password (HIGH PRIVILEGE)
    pub password: SecretString,
    /// Origin override; defaults to `https://{site_name}.myshopify.com`
    pub base_url: Option<Url>,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("site_name", &self.site_name)
            .field("api_key", &self.api_key)
            .field("password", &"[REDACTED]")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .finish()
    }
}

impl StoreConfig {
    /// Build the store's API credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the site name does not form a valid host.
    pub fn credentials(&self) -> Result<ShopCredentials, ShopifyError> {
        let credentials =
            ShopCredentials::new(&self.site_name, &self.api_key, self.password.clone())?;
        Ok(match &self.base_url {
            Some(base_url) => credentials.with_base_url(base_url.clone()),
            None => credentials,
        })
    }
}

/// Sync run configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Hours between runs
    pub execution_interval_hours: u32,
    /// Admin REST API version
    pub api_version: String,
    /// Listing pages followed per store
    pub max_pages: usize,
    /// Stores to keep in sync, in configuration order
    pub stores: Vec<StoreConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Emit JSON logs
    pub log_json: bool,
}

impl SyncConfig {
    /// Load configuration from environment variables and the store list.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the store list cannot be read or fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let execution_interval_hours =
            parse_interval_hours(&get_required_env("EXECUTION_TIME_INTERVAL")?)?;
        let max_pages = get_env_or_default("PRICESYNC_MAX_PAGES", &DEFAULT_MAX_PAGES.to_string())
            .parse::<usize>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("PRICESYNC_MAX_PAGES".to_string(), e.to_string())
            })?;
        let stores_file = get_env_or_default("PRICESYNC_STORES_FILE", DEFAULT_STORES_FILE);
        let stores = load_stores(Path::new(&stores_file))?;

        Ok(Self {
            execution_interval_hours,
            api_version: get_env_or_default("SHOPIFY_API_VERSION", DEFAULT_API_VERSION),
            max_pages,
            stores,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_optional_env("SENTRY_SAMPLE_RATE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            log_json: get_optional_env("PRICESYNC_LOG_JSON").is_some(),
        })
    }
}

#[derive(Deserialize)]
struct StoreList {
    #[serde(default)]
    stores: Vec<RawStore>,
}

#[derive(Deserialize)]
struct RawStore {
    site_name: String,
    api_key: String,
    password: String,
    #[serde(default)]
    base_url: Option<Url>,
}

/// Read and validate the store list at `path`.
///
/// # Errors
///
/// Returns `ConfigError::StoresFile` if the file cannot be read, otherwise
/// see [`parse_stores`].
pub fn load_stores(path: &Path) -> Result<Vec<StoreConfig>, ConfigError> {
    let yaml = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::StoresFile {
            path: path.to_path_buf(),
            source,
        })?;
    parse_stores(&yaml)
}

/// Parse and validate a YAML store list.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is invalid, the list is empty, a field
/// is blank, a password looks like a placeholder, or a site name repeats.
pub fn parse_stores(yaml: &str) -> Result<Vec<StoreConfig>, ConfigError> {
    let list: StoreList = serde_yaml::from_str(yaml)?;
    if list.stores.is_empty() {
        return Err(ConfigError::InvalidStore(
            "stores".to_string(),
            "at least one store is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    list.stores
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let label = if raw.site_name.trim().is_empty() {
                format!("#{index}")
            } else {
                raw.site_name.clone()
            };
            for (field, value) in [
                ("site_name", &raw.site_name),
                ("api_key", &raw.api_key),
                ("password", &raw.password),
            ] {
                if value.trim().is_empty() {
                    return Err(ConfigError::InvalidStore(label, format!("{field} is empty")));
                }
            }
            validate_secret(&raw.password, &format!("{label}.password"))?;
            if !seen.insert(raw.site_name.clone()) {
                return Err(ConfigError::InvalidStore(label, "duplicate site_name".to_string()));
            }

            Ok(StoreConfig {
                site_name: raw.site_name,
                api_key: raw.api_key,
                password: SecretString::from(raw.password),
                base_url: raw.base_url,
            })
        })
        .collect()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse the run interval: a whole number of hours, at least one and at most
/// [`MAX_EXECUTION_INTERVAL_HOURS`].
fn parse_interval_hours(value: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: String| {
        ConfigError::InvalidEnvVar("EXECUTION_TIME_INTERVAL".to_string(), reason)
    };
    let hours = value
        .trim()
        .parse::<u32>()
        .map_err(|e| invalid(e.to_string()))?;
    if hours == 0 || hours > MAX_EXECUTION_INTERVAL_HOURS {
        return Err(invalid(format!(
            "must be between 1 and {MAX_EXECUTION_INTERVAL_HOURS} hours (got {hours})"
        )));
    }
    Ok(hours)
}

/// Reject secrets that look like unfilled template values.
fn validate_secret(secret: &str, name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    Ok(())
}
