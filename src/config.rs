//! Centralized configuration management for schooldesk

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};

const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the school management REST API
    pub api_url: String,
    /// File holding the persisted session token
    pub session_file: PathBuf,
    /// HTTP client configuration
    pub http: HttpConfig,
    /// List view and dashboard behaviour
    pub view: ViewConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

/// List view configuration
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Rows per table page
    pub page_size: usize,
    /// Dashboard refresh interval in seconds
    pub poll_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: "schooldesk/0.1.0".to_string(),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 10,
            poll_seconds: 30,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: default_session_file(),
            http: HttpConfig::default(),
            view: ViewConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let api_url = std::env::var("SCHOOLDESK_API_URL")
            .unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let session_file = std::env::var("SCHOOLDESK_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_session_file());

        let http = HttpConfig {
            timeout_seconds: parse_env_var("SCHOOLDESK_HTTP_TIMEOUT_SECONDS")?.unwrap_or(30),
            user_agent: std::env::var("SCHOOLDESK_USER_AGENT")
                .unwrap_or_else(|_| "schooldesk/0.1.0".to_string()),
        };

        let view = ViewConfig {
            page_size: parse_env_var("SCHOOLDESK_PAGE_SIZE")?.unwrap_or(10),
            poll_seconds: parse_env_var("SCHOOLDESK_POLL_SECONDS")?.unwrap_or(30),
        };

        Ok(Config {
            api_url: api_url.trim_end_matches('/').to_string(),
            session_file,
            http,
            view,
        })
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Get dashboard polling interval as Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.view.poll_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "SCHOOLDESK_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            ));
        }

        if self.view.page_size == 0 {
            return Err(anyhow::anyhow!("Page size must be at least 1"));
        }

        if self.view.poll_seconds == 0 {
            return Err(anyhow::anyhow!("Polling interval must be at least 1 second"));
        }

        if let Some(parent) = self.session_file.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Cannot create session directory: {}", parent.display())
                })?;
            }
        }

        Ok(())
    }
}

fn default_session_file() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".schooldesk").join("session.json"),
        Err(_) => PathBuf::from(".schooldesk-session.json"),
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8000/api");
        assert_eq!(config.view.page_size, 10);
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            session_file: dir.path().join("nested").join("session.json"),
            ..Config::default()
        };
        config.validate().unwrap();
        assert!(dir.path().join("nested").exists());

        config.view.page_size = 0;
        assert!(config.validate().is_err());

        config.view.page_size = 10;
        config.api_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());
    }
}
