//! Configuration
//!
//! Backend URL and timeout, router base, dev server, downloads and logging
//! settings. Read from a TOML file; `OPENIKT_*` environment variables take
//! precedence over file values.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub router: RouterConfig,

    #[serde(default)]
    pub dev_server: DevServerConfig,

    #[serde(default)]
    pub downloads: DownloadsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,

    #[serde(default = "default_csrf_cookie")]
    pub csrf_cookie: String,

    #[serde(default = "default_csrf_header")]
    pub csrf_header: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout() -> u64 {
    60_000 // 60 seconds
}

fn default_csrf_cookie() -> String {
    "csrftoken".to_string()
}

fn default_csrf_header() -> String {
    "X-CSRFToken".to_string()
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
            csrf_cookie: default_csrf_cookie(),
            csrf_header: default_csrf_header(),
        }
    }
}

/// Client-side routing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_router_base")]
    pub base: String,

    #[serde(default = "default_app_title")]
    pub app_title: String,
}

fn default_router_base() -> String {
    crate::router::DEFAULT_BASE.to_string()
}

fn default_app_title() -> String {
    crate::router::DEFAULT_APP_TITLE.to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            base: default_router_base(),
            app_title: default_app_title(),
        }
    }
}

/// Development server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DevServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,

    /// Backend that proxied requests are forwarded to
    #[serde(default)]
    pub proxy_target: Option<String>,

    /// Built frontend assets, served under the router base
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7777
}

fn default_proxy_prefix() -> String {
    "/v1".to_string()
}

impl DevServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            proxy_prefix: default_proxy_prefix(),
            proxy_target: None,
            static_dir: None,
        }
    }
}

/// Where exported files are saved
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadsConfig {
    #[serde(default = "default_download_dir")]
    pub dir: String,
}

fn default_download_dir() -> String {
    dirs::download_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| ".".to_string())
}

impl DownloadsConfig {
    /// Download directory with a leading `~/` expanded
    pub fn path(&self) -> PathBuf {
        match (self.dir.strip_prefix("~/"), dirs::home_dir()) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(&self.dir),
        }
    }
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            dir: default_download_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("openikt").join("config.toml")),
            Some(PathBuf::from("/etc/openikt/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::debug!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var("OPENIKT_API_URL") {
            self.api.base_url = url;
        }
        if let Some(timeout) = var("OPENIKT_API_TIMEOUT_MS").and_then(|t| t.parse().ok()) {
            self.api.timeout_ms = timeout;
        }

        if let Some(target) = var("OPENIKT_DEV_PROXY_URL") {
            self.dev_server.proxy_target = Some(target);
        }
        if let Some(port) = var("OPENIKT_DEV_PORT").and_then(|p| p.parse().ok()) {
            self.dev_server.port = port;
        }

        if let Some(dir) = var("OPENIKT_DOWNLOAD_DIR") {
            self.downloads.dir = dir;
        }

        if let Some(level) = var("OPENIKT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("OPENIKT_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# OpenIKT Web Configuration
#
# Environment variables override these settings:
# - OPENIKT_API_URL
# - OPENIKT_API_TIMEOUT_MS
# - OPENIKT_DEV_PROXY_URL
# - OPENIKT_DEV_PORT
# - OPENIKT_DOWNLOAD_DIR
# - OPENIKT_LOG_LEVEL
# - OPENIKT_LOG_FORMAT

[api]
# Backend base URL
base_url = "http://localhost:8000"

# Request timeout in milliseconds, applied to every request
timeout_ms = 60000

# Cookie holding the CSRF token and the header it is echoed in
csrf_cookie = "csrftoken"
csrf_header = "X-CSRFToken"

[router]
# Public path the frontend is served under
base = "/openikt/"

# Document title when a page declares none
app_title = "OpenIKT"

[dev_server]
host = "0.0.0.0"
port = 7777

# Requests under this prefix are forwarded to proxy_target, prefix removed
proxy_prefix = "/v1"
# proxy_target = "http://localhost:8000"

# Built frontend to serve under the router base
# static_dir = "./dist"

[downloads]
# Where exported spreadsheets are saved
dir = "~/Downloads"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.timeout(), Duration::from_secs(60));
        assert_eq!(config.api.csrf_cookie, "csrftoken");
        assert_eq!(config.api.csrf_header, "X-CSRFToken");
        assert_eq!(config.router.base, "/openikt/");
        assert_eq!(config.dev_server.addr(), "0.0.0.0:7777");
        assert_eq!(config.dev_server.proxy_prefix, "/v1");
    }

    #[test]
    fn test_parse_partial_file() {
        let config = Config::parse(
            r#"
            [api]
            base_url = "https://openikt.example.com"

            [dev_server]
            proxy_target = "http://backend:8000"
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://openikt.example.com");
        assert_eq!(config.api.timeout_ms, 60_000);
        assert_eq!(
            config.dev_server.proxy_target.as_deref(),
            Some("http://backend:8000")
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_generated_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.dev_server.port, 7777);
    }

    #[test]
    fn test_download_path_expands_home() {
        let downloads = DownloadsConfig {
            dir: "/tmp/exports".to_string(),
        };
        assert_eq!(downloads.path(), PathBuf::from("/tmp/exports"));

        if let Some(home) = dirs::home_dir() {
            let downloads = DownloadsConfig {
                dir: "~/Downloads".to_string(),
            };
            assert_eq!(downloads.path(), home.join("Downloads"));
        }
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("[api\nbase_url = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars = HashMap::from([
            ("OPENIKT_API_URL", "http://api:9000"),
            ("OPENIKT_API_TIMEOUT_MS", "1500"),
            ("OPENIKT_DEV_PROXY_URL", "http://proxy:8000"),
            ("OPENIKT_DEV_PORT", "not-a-port"),
            ("OPENIKT_LOG_FORMAT", "json"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api.base_url, "http://api:9000");
        assert_eq!(config.api.timeout_ms, 1500);
        assert_eq!(
            config.dev_server.proxy_target.as_deref(),
            Some("http://proxy:8000")
        );
        assert_eq!(config.dev_server.port, 7777);
        assert_eq!(config.logging.format, "json");
    }
}
