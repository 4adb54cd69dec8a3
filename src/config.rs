//! Configuration management for the product agent.
//!
//! The model provider key is read once at start-up from a JSON credentials
//! file (default `config.json`, override with `CONFIG_PATH`) which must contain
//! `ANTHROPIC_API_KEY`. Everything else comes from optional environment variables:
//! - `DEFAULT_MODEL` - Model identifier. Defaults to `claude-3-5-sonnet-20240620`.
//! - `ANTHROPIC_BASE_URL` - Messages API base URL. Defaults to `https://api.anthropic.com`.
//! - `HOST` - Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Server port. Defaults to `3000`.
//! - `MAX_ITERATIONS` - Maximum dispatcher steps per query. Defaults to `10`.
//! - `WEBDRIVER_URL` - WebDriver endpoint for catalog search. Defaults to `http://localhost:9515`.
//! - `BROWSER_NAME` - Browser requested from the WebDriver. Defaults to `MicrosoftEdge`.
//! - `CATALOG_BASE_URL` - Catalog host. Defaults to `https://www.webstaurantstore.com`.
//! - `SPEC_SHEET_BASE_URL` - Spec sheet host. Defaults to `https://icecastlefh.com`.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Name of the credential entry inside the config file.
pub const API_KEY_FIELD: &str = "ANTHROPIC_API_KEY";

const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} file not found. Please create one with your API keys.", .0.display())]
    FileNotFound(PathBuf),

    #[error("Missing key in {}: {key}", .path.display())]
    MissingKey { path: PathBuf, key: String },

    #[error("Failed to read {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    /// Process exit status for this failure; each cause gets its own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::FileNotFound(_) => 2,
            ConfigError::MissingKey { .. } => 3,
            ConfigError::Unreadable { .. } => 4,
            ConfigError::InvalidValue(..) => 5,
        }
    }
}

/// Catalog search tool configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Catalog site root, without trailing slash
    pub base_url: String,

    /// WebDriver server endpoint
    pub webdriver_url: String,

    /// Browser name sent in the WebDriver capabilities
    pub browser_name: String,

    /// Products returned when the caller gives no limit
    pub default_limit: usize,

    /// Attempts made while waiting for the result list
    pub max_retries: u32,

    /// How long a single wait attempt may take
    pub wait_timeout: Duration,

    /// Sleep between wait attempts
    pub retry_backoff: Duration,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.webstaurantstore.com".to_string(),
            webdriver_url: "http://localhost:9515".to_string(),
            browser_name: "MicrosoftEdge".to_string(),
            default_limit: 10,
            max_retries: 3,
            wait_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(3),
        }
    }
}

/// Spec sheet tool configuration.
#[derive(Debug, Clone)]
pub struct SpecSheetConfig {
    /// Vehicle site root, without trailing slash
    pub base_url: String,

    /// Timeout for each page or document request
    pub request_timeout: Duration,
}

impl Default for SpecSheetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://icecastlefh.com".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Model provider API key
    pub api_key: String,

    /// Model identifier used for every dispatcher call
    pub default_model: String,

    /// Messages API base URL
    pub llm_base_url: String,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Maximum dispatcher steps per query
    pub max_iterations: usize,

    pub catalog: CatalogConfig,

    pub spec_sheet: SpecSheetConfig,
}

impl Config {
    /// Load the credentials file named by `CONFIG_PATH` (or `config.json`)
    /// and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::from_file(&path)
    }

    /// Load configuration using the API key stored in `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::FileNotFound` when the file is absent and
    /// `ConfigError::MissingKey` when it has no usable `ANTHROPIC_API_KEY`.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let api_key = load_api_key(path)?;
        let mut config = Self::new(api_key, default_model());

        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            config.default_model = model;
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            config.llm_base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        config.port = env_parse("PORT", config.port)?;
        config.max_iterations = env_parse("MAX_ITERATIONS", config.max_iterations)?;
        if config.max_iterations == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_ITERATIONS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        if let Ok(url) = std::env::var("WEBDRIVER_URL") {
            config.catalog.webdriver_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(browser) = std::env::var("BROWSER_NAME") {
            config.catalog.browser_name = browser;
        }
        if let Ok(url) = std::env::var("CATALOG_BASE_URL") {
            config.catalog.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(url) = std::env::var("SPEC_SHEET_BASE_URL") {
            config.spec_sheet.base_url = url.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(api_key: String, default_model: String) -> Self {
        Self {
            api_key,
            default_model,
            llm_base_url: "https://api.anthropic.com".to_string(),
            host: "127.0.0.1".to_string(),
            port: 3000,
            max_iterations: 10,
            catalog: CatalogConfig::default(),
            spec_sheet: SpecSheetConfig::default(),
        }
    }
}

fn default_model() -> String {
    "claude-3-5-sonnet-20240620".to_string()
}

/// Read the API key from a JSON credentials file.
pub fn load_api_key(path: &Path) -> Result<String, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    let value: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    value
        .get(API_KEY_FIELD)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingKey {
            path: path.to_path_buf(),
            key: API_KEY_FIELD.to_string(),
        })
}

fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp file");
        file.write_all(contents.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn reads_api_key_from_file() {
        let file = write_config(r#"{"ANTHROPIC_API_KEY": "sk-test"}"#);
        assert_eq!(load_api_key(file.path()).unwrap(), "sk-test");
    }

    #[test]
    fn missing_file_is_distinct_from_missing_key() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = load_api_key(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(missing, ConfigError::FileNotFound(_)));

        let file = write_config(r#"{"OTHER_KEY": "x"}"#);
        let no_key = load_api_key(file.path()).unwrap_err();
        assert!(matches!(no_key, ConfigError::MissingKey { .. }));
        assert!(no_key.to_string().contains(API_KEY_FIELD));

        assert_ne!(missing.exit_code(), no_key.exit_code());
        assert_ne!(missing.exit_code(), 0);
        assert_ne!(no_key.exit_code(), 0);
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let file = write_config(r#"{"ANTHROPIC_API_KEY": "   "}"#);
        assert!(matches!(
            load_api_key(file.path()),
            Err(ConfigError::MissingKey { .. })
        ));
    }

    #[test]
    fn malformed_json_is_unreadable() {
        let file = write_config("{not json");
        let err = load_api_key(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn unparseable_env_value_is_invalid() {
        std::env::set_var("PRODUCT_AGENT_TEST_PORT", "eighty");
        let err = env_parse::<u16>("PRODUCT_AGENT_TEST_PORT", 3000).unwrap_err();
        std::env::remove_var("PRODUCT_AGENT_TEST_PORT");

        assert!(matches!(
            err,
            ConfigError::InvalidValue(ref name, _) if name == "PRODUCT_AGENT_TEST_PORT"
        ));
        assert!(err.to_string().starts_with("Invalid value for PRODUCT_AGENT_TEST_PORT"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn unset_env_value_keeps_default() {
        std::env::remove_var("PRODUCT_AGENT_TEST_UNSET");
        assert_eq!(env_parse("PRODUCT_AGENT_TEST_UNSET", 42usize).unwrap(), 42);

        std::env::set_var("PRODUCT_AGENT_TEST_SET", " 7 ");
        assert_eq!(env_parse("PRODUCT_AGENT_TEST_SET", 42usize).unwrap(), 7);
        std::env::remove_var("PRODUCT_AGENT_TEST_SET");
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let file = write_config(r#"{"ANTHROPIC_API_KEY": "sk-test"}"#);
        std::env::set_var("MAX_ITERATIONS", "0");
        let result = Config::from_file(file.path());
        std::env::remove_var("MAX_ITERATIONS");

        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "MAX_ITERATIONS"));
        assert_eq!(err.exit_code(), 5);
    }

    #[test]
    fn new_uses_documented_defaults() {
        let config = Config::new("key".to_string(), "model".to_string());
        assert_eq!(config.port, 3000);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.catalog.max_retries, 3);
        assert_eq!(config.catalog.default_limit, 10);
        assert_eq!(config.spec_sheet.base_url, "https://icecastlefh.com");
    }
}
