//! Client configuration
//!
//! A [`ClientConfig`] can be built in code, read from the environment or
//! loaded from a JSON file.

use crate::types::{DEFAULT_BASE_URL, DEFAULT_CALLBACK_SOURCES, DEFAULT_PAY_URL, DEFAULT_TIMEOUT};
use crate::{PiastrixError, Result};
use serde::Deserialize;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Shop credentials and service addresses
#[derive(Clone)]
pub struct ClientConfig {
    /// Shop identifier
    pub shop_id: String,
    /// Shared secret used for signing
    pub secret_key: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// API base URL, always ending in `/`
    pub base_url: Url,
    /// Host of the browser payment form, always ending in `/`
    pub pay_url: Url,
    /// Addresses callbacks are accepted from
    pub callback_sources: Vec<IpAddr>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("shop_id", &self.shop_id)
            .field("secret_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("base_url", &self.base_url.as_str())
            .field("pay_url", &self.pay_url.as_str())
            .field("callback_sources", &self.callback_sources)
            .finish()
    }
}

/// On-disk layout of a configuration file
#[derive(Debug, Deserialize)]
struct ConfigFile {
    shop_id: String,
    secret_key: String,
    timeout_secs: Option<u64>,
    base_url: Option<String>,
    pay_url: Option<String>,
    callback_sources: Option<Vec<String>>,
}

impl ClientConfig {
    /// Create a config with production URLs and the default timeout
    pub fn new(shop_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            shop_id: shop_id.into(),
            secret_key: secret_key.into(),
            timeout: DEFAULT_TIMEOUT,
            base_url: default_url(DEFAULT_BASE_URL),
            pay_url: default_url(DEFAULT_PAY_URL),
            callback_sources: DEFAULT_CALLBACK_SOURCES.to_vec(),
        }
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        self.base_url = parse_service_url(url)?;
        Ok(self)
    }

    /// Set the payment form host
    pub fn with_pay_url(mut self, url: &str) -> Result<Self> {
        self.pay_url = parse_service_url(url)?;
        Ok(self)
    }

    /// Replace the callback allow-list
    pub fn with_callback_sources(mut self, sources: impl IntoIterator<Item = IpAddr>) -> Self {
        self.callback_sources = sources.into_iter().collect();
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let shop_id = std::env::var("PIASTRIX_SHOP_ID")
            .map_err(|_| PiastrixError::config("PIASTRIX_SHOP_ID is required"))?;
        let secret_key = std::env::var("PIASTRIX_SECRET_KEY")
            .map_err(|_| PiastrixError::config("PIASTRIX_SECRET_KEY is required"))?;

        let mut config = Self::new(shop_id, secret_key);

        if let Ok(timeout) = std::env::var("PIASTRIX_TIMEOUT_SECS") {
            let secs: u64 = timeout
                .parse()
                .map_err(|e| PiastrixError::config(format!("Invalid PIASTRIX_TIMEOUT_SECS: {}", e)))?;
            config.timeout = Duration::from_secs(secs);
        }

        if let Ok(base_url) = std::env::var("PIASTRIX_BASE_URL") {
            config = config.with_base_url(&base_url)?;
        }

        if let Ok(pay_url) = std::env::var("PIASTRIX_PAY_URL") {
            config = config.with_pay_url(&pay_url)?;
        }

        if let Ok(sources) = std::env::var("PIASTRIX_CALLBACK_SOURCES") {
            config.callback_sources = parse_sources(sources.split(','))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| PiastrixError::config(format!("Failed to read config file: {}", e)))?;

        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| PiastrixError::config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Self::new(file.shop_id, file.secret_key);

        if let Some(secs) = file.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(base_url) = file.base_url {
            config = config.with_base_url(&base_url)?;
        }
        if let Some(pay_url) = file.pay_url {
            config = config.with_pay_url(&pay_url)?;
        }
        if let Some(sources) = file.callback_sources {
            config.callback_sources = parse_sources(sources.iter().map(String::as_str))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.shop_id.is_empty() {
            return Err(PiastrixError::config("Shop id cannot be empty"));
        }

        if self.secret_key.is_empty() {
            return Err(PiastrixError::config("Secret key cannot be empty"));
        }

        if self.timeout.is_zero() {
            return Err(PiastrixError::config("Timeout must be positive"));
        }

        for url in [&self.base_url, &self.pay_url] {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(PiastrixError::config(format!(
                    "URL must use http or https: {}",
                    url
                )));
            }
        }

        Ok(())
    }
}

/// Parse a service URL, forcing a trailing `/` so relative joins keep its path.
fn parse_service_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_url(raw: &'static str) -> Url {
    Url::parse(raw).unwrap_or_else(|e| unreachable!("built-in URL {raw} is invalid: {e}"))
}

fn parse_sources<'a>(raw: impl Iterator<Item = &'a str>) -> Result<Vec<IpAddr>> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|e| PiastrixError::config(format!("Invalid callback source {}: {}", s, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let config = ClientConfig::new("112", "SecretKey01");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.base_url.as_str(), "https://core.piastrix.com/");
        assert_eq!(config.pay_url.as_str(), "https://pay.piastrix.com/");
        assert_eq!(config.callback_sources.len(), 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = ClientConfig::new("112", "SecretKey01");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("SecretKey01"));
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("112"));
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new("1", "k")
            .with_base_url("http://127.0.0.1:8080/api")
            .unwrap();
        assert_eq!(config.base_url.as_str(), "http://127.0.0.1:8080/api/");
        assert_eq!(
            config.base_url.join("bill/create").unwrap().as_str(),
            "http://127.0.0.1:8080/api/bill/create"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            ClientConfig::new("1", "k").with_base_url("not a url"),
            Err(PiastrixError::Url(_))
        ));
    }

    #[test]
    fn test_validation_failures() {
        assert!(ClientConfig::new("", "k").validate().is_err());
        assert!(ClientConfig::new("1", "").validate().is_err());
        assert!(ClientConfig::new("1", "k")
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ClientConfig::new("1", "k")
            .with_base_url("ftp://core.piastrix.com/")
            .unwrap()
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "shop_id": "112",
                "secret_key": "SecretKey01",
                "timeout_secs": 3,
                "base_url": "http://localhost:9000",
                "callback_sources": ["10.0.0.1", " 10.0.0.2 "]
            }}"#
        )
        .unwrap();

        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.shop_id, "112");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.base_url.as_str(), "http://localhost:9000/");
        assert_eq!(config.pay_url.as_str(), "https://pay.piastrix.com/");
        assert_eq!(
            config.callback_sources,
            vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "10.0.0.2".parse::<IpAddr>().unwrap()
            ]
        );
    }

    #[test]
    fn test_from_file_rejects_bad_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"shop_id": "1", "secret_key": "k", "callback_sources": ["nope"]}}"#
        )
        .unwrap();

        assert!(matches!(
            ClientConfig::from_file(file.path()),
            Err(PiastrixError::Config { .. })
        ));
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("PIASTRIX_SHOP_ID", "77");
        std::env::set_var("PIASTRIX_SECRET_KEY", "env-secret");
        std::env::set_var("PIASTRIX_TIMEOUT_SECS", "4");
        std::env::set_var("PIASTRIX_CALLBACK_SOURCES", "10.1.1.1,10.1.1.2");

        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.shop_id, "77");
        assert_eq!(config.secret_key, "env-secret");
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert_eq!(config.callback_sources.len(), 2);

        std::env::set_var("PIASTRIX_TIMEOUT_SECS", "soon");
        assert!(matches!(
            ClientConfig::from_env(),
            Err(PiastrixError::Config { .. })
        ));

        for var in [
            "PIASTRIX_SHOP_ID",
            "PIASTRIX_SECRET_KEY",
            "PIASTRIX_TIMEOUT_SECS",
            "PIASTRIX_CALLBACK_SOURCES",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            ClientConfig::from_file("/nonexistent/piastrix.json"),
            Err(PiastrixError::Config { .. })
        ));
    }
}
