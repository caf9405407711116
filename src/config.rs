use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{ExporterError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub harbor: HarborConfig,
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-probe enablement overrides, keyed by probe name
    #[serde(default)]
    pub collect: HashMap<String, bool>,
    /// Replaces the version reported by the systeminfo probe
    #[serde(default)]
    pub override_version: Option<String>,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct HarborConfig {
    /// HTTP API address of the harbor server, e.g. https://harbor.local/api
    pub url: String,
    pub username: String,
    pub password: String,
    /// User agent of the harbor http client
    pub user_agent: String,
    /// Timeout on HTTP requests to the harbor API in milliseconds
    pub timeout_ms: u64,
    /// Disable TLS certificate verification
    pub insecure: bool,
}

impl Default for HarborConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: "admin".to_string(),
            password: "password".to_string(),
            user_agent: "harbor_exporter".to_string(),
            timeout_ms: 1600,
            insecure: false,
        }
    }
}

impl std::fmt::Debug for HarborConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarborConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("timeout_ms", &self.timeout_ms)
            .field("insecure", &self.insecure)
            .finish()
    }
}

impl HarborConfig {
    /// Normalized API base address without a trailing slash.
    ///
    /// A missing scheme defaults to `http://`; only http and https are accepted.
    pub fn base_url(&self) -> Result<String> {
        let raw = self.url.trim();
        let uri = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("http://{raw}")
        };

        let parsed = Url::parse(&uri).map_err(|e| ExporterError::InvalidUrl(format!("{uri}: {e}")))?;
        let has_host = parsed.host_str().map(|h| !h.is_empty()).unwrap_or(false);
        if !has_host || !matches!(parsed.scheme(), "http" | "https") {
            return Err(ExporterError::InvalidUrl(uri));
        }

        Ok(uri.trim_end_matches('/').to_string())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Address to listen on for the landing page and telemetry
    pub listen_address: String,
    /// Path under which to expose metrics
    pub telemetry_path: String,
    /// Upper bound for one scrape cycle in milliseconds (none = unbounded)
    pub scrape_timeout_ms: Option<u64>,
    /// Subtracted from the Prometheus scrape timeout header
    pub scrape_timeout_offset_ms: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9107".to_string(),
            telemetry_path: "/metrics".to_string(),
            scrape_timeout_ms: None,
            scrape_timeout_offset_ms: 500,
        }
    }
}

impl WebConfig {
    /// Parse the listen address, accepting the `:9107` shorthand.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        let addr = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };
        addr.parse().map_err(|e| {
            ExporterError::InvalidConfig(vec![format!(
                "invalid listen address {}: {e}",
                self.listen_address
            )])
        })
    }

    pub fn scrape_timeout(&self) -> Option<Duration> {
        self.scrape_timeout_ms.map(Duration::from_millis)
    }

    pub fn scrape_timeout_offset(&self) -> Duration {
        Duration::from_millis(self.scrape_timeout_offset_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON formatted logs
    pub json: bool,
    /// Write logs to this file instead of stdout
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a file (optional) and environment
    pub fn load_from<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            // HARBOR_EXPORTER__HARBOR__URL, HARBOR_EXPORTER__WEB__LISTEN_ADDRESS, ...
            .add_source(
                Environment::with_prefix("HARBOR_EXPORTER")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.apply_credentials_env();
        Ok(cfg)
    }

    /// Apply the `HARBOR_USERNAME` / `HARBOR_PASSWORD` overrides.
    pub fn apply_credentials_env(&mut self) {
        if let Ok(user) = std::env::var("HARBOR_USERNAME") {
            if !user.is_empty() {
                self.harbor.username = user;
            }
        }
        if let Ok(pass) = std::env::var("HARBOR_PASSWORD") {
            if !pass.is_empty() {
                self.harbor.password = pass;
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.harbor.url.trim().is_empty() {
            errors.push("harbor server address is required".to_string());
        } else if let Err(e) = self.harbor.base_url() {
            errors.push(e.to_string());
        }

        if self.harbor.timeout_ms == 0 {
            errors.push("harbor request timeout must be positive".to_string());
        }

        if !self.web.telemetry_path.starts_with('/') {
            errors.push(format!(
                "telemetry path must start with '/': {}",
                self.web.telemetry_path
            ));
        } else if matches!(self.web.telemetry_path.as_str(), "/" | "/-/ready" | "/-/healthy") {
            errors.push(format!(
                "telemetry path {} is already served",
                self.web.telemetry_path
            ));
        }

        if self.web.scrape_timeout_ms == Some(0) {
            errors.push("scrape timeout must be positive when set".to_string());
        }

        if let Err(e) = self.web.listen_addr() {
            errors.push(e.to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harbor(url: &str) -> HarborConfig {
        HarborConfig {
            url: url.to_string(),
            ..HarborConfig::default()
        }
    }

    #[test]
    fn test_base_url_defaults_to_http() {
        assert_eq!(
            harbor("harbor.local/api").base_url().unwrap(),
            "http://harbor.local/api"
        );
        assert_eq!(
            harbor("https://harbor.local/api/").base_url().unwrap(),
            "https://harbor.local/api"
        );
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(harbor("ftp://harbor.local").base_url().is_err());
        assert!(harbor("http://").base_url().is_err());
    }

    #[test]
    fn test_password_is_redacted() {
        let cfg = HarborConfig {
            password: "hunter2".to_string(),
            ..harbor("harbor.local")
        };
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_listen_addr_shorthand() {
        let web = WebConfig {
            listen_address: ":9107".to_string(),
            ..WebConfig::default()
        };
        assert_eq!(web.listen_addr().unwrap(), "0.0.0.0:9107".parse().unwrap());
    }

    #[test]
    fn test_validate_collects_all_problems() {
        let cfg = AppConfig {
            harbor: HarborConfig {
                timeout_ms: 0,
                ..HarborConfig::default()
            },
            web: WebConfig {
                telemetry_path: "metrics".to_string(),
                ..WebConfig::default()
            },
            ..AppConfig::default()
        };

        let errors = cfg.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_defaults_are_valid_with_url() {
        let cfg = AppConfig {
            harbor: harbor("https://harbor.local/api"),
            ..AppConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.harbor.timeout(), Duration::from_millis(1600));
        assert_eq!(cfg.web.telemetry_path, "/metrics");
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let cfg = AppConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(cfg.harbor.user_agent, "harbor_exporter");
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.collect.is_empty());
    }
}
