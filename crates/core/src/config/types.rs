use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::declarative::DeclarativeConfig;
use crate::native::{MadaraSite, NativeOptions};
use crate::resilience::{FetchSettings, RetryPolicy, Transport};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
    #[serde(default)]
    pub declarative: Vec<DeclarativeConfig>,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    FetchSettings::default().user_agent
}

fn default_accept_language() -> String {
    FetchSettings::default().accept_language
}

/// Per-connector request spacing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

fn default_min_interval_ms() -> u64 {
    750
}

/// Retry on HTTP 429
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff schedule; the last entry repeats.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: Vec<u64>,
    #[serde(default = "default_retry_after_cap_ms")]
    pub retry_after_cap_ms: u64,
    #[serde(default = "default_penalty_floor_ms")]
    pub penalty_floor_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            retry_after_cap_ms: default_retry_after_cap_ms(),
            penalty_floor_ms: default_penalty_floor_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> Vec<u64> {
    vec![350, 800, 1500]
}

fn default_retry_after_cap_ms() -> u64 {
    4000
}

fn default_penalty_floor_ms() -> u64 {
    2000
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: self.backoff_ms.iter().map(|ms| Duration::from_millis(*ms)).collect(),
            retry_after_cap: Duration::from_millis(self.retry_after_cap_ms),
            penalty_floor: Duration::from_millis(self.penalty_floor_ms),
        }
    }
}

/// Sitemap catalog cache
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Catalog lifetime in seconds (default: 1800)
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    30 * 60
}

/// Built-in connector selection
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConnectorsConfig {
    /// Built-in keys to leave out of the registry
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Extra WordPress-Madara sites
    #[serde(default)]
    pub madara: Vec<MadaraSite>,
}

impl ConnectorsConfig {
    pub fn is_disabled(&self, key: &str) -> bool {
        self.disabled.iter().any(|d| d.trim().eq_ignore_ascii_case(key))
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog.ttl_secs)
    }

    /// Fetch settings every connector starts from.
    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            user_agent: self.http.user_agent.clone(),
            accept_language: self.http.accept_language.clone(),
            min_interval: Duration::from_millis(self.pacing.min_interval_ms),
            retry: self.retry.policy(),
        }
    }

    pub fn native_options(&self, transport: std::sync::Arc<dyn Transport>) -> NativeOptions {
        NativeOptions {
            transport,
            fetch: self.fetch_settings(),
            catalog_ttl: self.catalog_ttl(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.accept_language, "en-US,en;q=0.9");
        assert_eq!(config.pacing.min_interval_ms, 750);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.backoff_ms, vec![350, 800, 1500]);
        assert_eq!(config.catalog.ttl_secs, 1800);
        assert!(config.connectors.disabled.is_empty());
        assert!(config.declarative.is_empty());
    }

    #[test]
    fn test_deserialize_sections() {
        let toml = r#"
[http]
timeout_secs = 10

[pacing]
min_interval_ms = 1000

[retry]
max_retries = 1
backoff_ms = [100]

[connectors]
disabled = ["asura"]

[[connectors.madara]]
key = "toonily"
name = "Toonily"
base_url = "https://toonily.com/"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.http.timeout_secs, 10);
        assert!(config.connectors.is_disabled("Asura"));
        assert!(!config.connectors.is_disabled("mgeko"));
        assert_eq!(config.connectors.madara.len(), 1);
        assert_eq!(config.connectors.madara[0].key, "toonily");
        // untouched fields keep their defaults
        assert_eq!(config.retry.retry_after_cap_ms, 4000);
    }

    #[test]
    fn test_deserialize_declarative_camel_case() {
        let toml = r#"
[[declarative]]
key = "mangadex"
name = "MangaDex"
baseUrl = "https://api.example.org/"

[declarative.search]
path = "/search"

[declarative.resolve]
path = "/resolve"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.declarative.len(), 1);
        assert_eq!(config.declarative[0].base_url, "https://api.example.org/");
        assert!(config.declarative[0].enabled);
    }

    #[test]
    fn test_fetch_settings_conversion() {
        let mut config = Config::default();
        config.pacing.min_interval_ms = 200;
        config.retry.backoff_ms = vec![10, 20];

        let settings = config.fetch_settings();
        assert_eq!(settings.min_interval, Duration::from_millis(200));
        assert_eq!(
            settings.retry.backoff,
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
        assert_eq!(settings.retry.penalty_floor, Duration::from_secs(2));
        assert_eq!(config.catalog_ttl(), Duration::from_secs(1800));
    }
}
