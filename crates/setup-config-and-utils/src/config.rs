//! Configuration for the setup flow.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Supabase management API.
pub const DEFAULT_API_URL: &str = "https://api.supabase.com";

/// Supabase dashboard (hosts the CLI login page).
pub const DEFAULT_DASHBOARD_URL: &str = "https://supabase.com";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Default bound on every platform request.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Prefix of the token name shown on the platform's access-token page.
pub const DEFAULT_TOKEN_LABEL_PREFIX: &str = "gateflow_setup";

const MIN_HTTP_TIMEOUT_SECS: u64 = 1;
const MAX_HTTP_TIMEOUT_SECS: u64 = 120;

/// Setup tool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Supabase management API base URL.
    pub api_url: String,
    /// Supabase dashboard base URL.
    pub dashboard_url: String,
    /// Timeout applied to each platform request, in seconds.
    pub http_timeout_secs: u64,
    /// Prefix for the token label registered with the platform.
    pub token_label_prefix: String,
    /// Whether step 1 tries to open the authorization URL in a browser.
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            dashboard_url: DEFAULT_DASHBOARD_URL.to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            token_label_prefix: DEFAULT_TOKEN_LABEL_PREFIX.to_string(),
            open_browser: true,
        }
    }
}

impl Config {
    /// Load configuration from the settings file (if present), then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from `GATEFLOW_*` environment variables.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).and_then(non_empty);

        if let Some(level) = lookup("GATEFLOW_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = lookup("GATEFLOW_SUPABASE_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = lookup("GATEFLOW_SUPABASE_DASHBOARD_URL") {
            self.dashboard_url = url;
        }
        if let Some(secs) = lookup("GATEFLOW_HTTP_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.http_timeout_secs = secs;
        }
        if let Some(flag) = lookup("GATEFLOW_NO_BROWSER") {
            self.open_browser = !matches!(flag.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// Trim trailing slashes and clamp the timeout into its supported range.
    pub fn normalize(&mut self) {
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        self.dashboard_url = self.dashboard_url.trim_end_matches('/').to_string();
        self.http_timeout_secs = self
            .http_timeout_secs
            .clamp(MIN_HTTP_TIMEOUT_SECS, MAX_HTTP_TIMEOUT_SECS);
    }

    /// Reject URLs that cannot be parsed or an empty label prefix.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        self.dashboard_url()?;
        if self.token_label_prefix.trim().is_empty() {
            return Err(CoreError::Config(
                "token_label_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the API URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// Get the dashboard URL as a parsed URL.
    pub fn dashboard_url(&self) -> CoreResult<Url> {
        Url::parse(&self.dashboard_url).map_err(CoreError::from)
    }

    /// Per-request timeout.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.dashboard_url, DEFAULT_DASHBOARD_URL);
        assert_eq!(config.http_timeout(), Duration::from_secs(20));
        assert!(config.open_browser);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_partial_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("setup.json");
        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_load_reads_settings_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        std::fs::write(
            paths.config_file(),
            r#"{ "http_timeout_secs": 15, "token_label_prefix": "ci_runner" }"#,
        )
        .unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.http_timeout_secs, 15);
        assert_eq!(loaded.token_label_prefix, "ci_runner");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env_from(&[
            ("GATEFLOW_LOG_LEVEL", "trace"),
            ("GATEFLOW_SUPABASE_API_URL", "http://127.0.0.1:9999/"),
            ("GATEFLOW_HTTP_TIMEOUT_SECS", "30"),
            ("GATEFLOW_NO_BROWSER", "1"),
        ]));
        config.normalize();

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.api_url, "http://127.0.0.1:9999");
        assert_eq!(config.http_timeout_secs, 30);
        assert!(!config.open_browser);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(env_from(&[
            ("GATEFLOW_SUPABASE_API_URL", "   "),
            ("GATEFLOW_HTTP_TIMEOUT_SECS", "not-a-number"),
        ]));

        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
    }

    #[test]
    fn test_timeout_is_clamped() {
        let mut config = Config {
            http_timeout_secs: 0,
            ..Config::default()
        };
        config.normalize();
        assert_eq!(config.http_timeout_secs, 1);

        config.http_timeout_secs = 10_000;
        config.normalize();
        assert_eq!(config.http_timeout_secs, 120);
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_label_prefix_rejected() {
        let config = Config {
            token_label_prefix: " ".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert!(config.api_url().unwrap().scheme().starts_with("http"));
    }
}
