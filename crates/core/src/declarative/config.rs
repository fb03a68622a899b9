//! Declarative connector configuration.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

fn default_true() -> bool {
    true
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_query_param() -> String {
    "q".to_string()
}

fn default_limit_param() -> String {
    "limit".to_string()
}

fn default_url_param() -> String {
    "url".to_string()
}

fn default_search_items_path() -> String {
    "items".to_string()
}

fn default_resolve_item_path() -> String {
    "item".to_string()
}

fn default_id_field() -> String {
    "id".to_string()
}

fn default_title_field() -> String {
    "title".to_string()
}

fn default_url_field() -> String {
    "url".to_string()
}

fn default_latest_chapter_field() -> String {
    "latestChapter".to_string()
}

/// A JSON API mapped onto the connector contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarativeConfig {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, alias = "base_url")]
    pub base_url: String,
    /// Hosts accepted by `resolve_by_url`; empty means the base URL host.
    #[serde(default, alias = "allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    #[serde(default = "default_health_path", alias = "health_path")]
    pub health_path: String,
    #[serde(default)]
    pub search: SearchEndpoint,
    #[serde(default)]
    pub resolve: ResolveEndpoint,
    #[serde(default)]
    pub response: ResponseShape,
}

/// `GET {path}?{query_param}=..&{limit_param}=..`
///
/// `{query}` and `{limit}` placeholders in `path` are substituted instead
/// when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEndpoint {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_query_param", alias = "query_param")]
    pub query_param: String,
    #[serde(default = "default_limit_param", alias = "limit_param")]
    pub limit_param: String,
}

impl Default for SearchEndpoint {
    fn default() -> Self {
        Self {
            path: String::new(),
            query_param: default_query_param(),
            limit_param: default_limit_param(),
        }
    }
}

/// `GET {path}?{url_param}=..`, or `{url}` substituted into `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveEndpoint {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_url_param", alias = "url_param")]
    pub url_param: String,
}

impl Default for ResolveEndpoint {
    fn default() -> Self {
        Self {
            path: String::new(),
            url_param: default_url_param(),
        }
    }
}

/// Where things are in the JSON responses. Paths and field names are
/// dot-separated; numeric segments index arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseShape {
    #[serde(default = "default_search_items_path", alias = "search_items_path")]
    pub search_items_path: String,
    #[serde(default = "default_resolve_item_path", alias = "resolve_item_path")]
    pub resolve_item_path: String,
    #[serde(default = "default_id_field", alias = "id_field")]
    pub id_field: String,
    #[serde(default = "default_title_field", alias = "title_field")]
    pub title_field: String,
    #[serde(default = "default_url_field", alias = "url_field")]
    pub url_field: String,
    #[serde(default = "default_latest_chapter_field", alias = "latest_chapter_field")]
    pub latest_chapter_field: String,
    #[serde(default, alias = "last_updated_field")]
    pub last_updated_field: Option<String>,
    #[serde(default, alias = "cover_image_field")]
    pub cover_image_field: Option<String>,
    #[serde(default, alias = "related_titles_field")]
    pub related_titles_field: Option<String>,
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self {
            search_items_path: default_search_items_path(),
            resolve_item_path: default_resolve_item_path(),
            id_field: default_id_field(),
            title_field: default_title_field(),
            url_field: default_url_field(),
            latest_chapter_field: default_latest_chapter_field(),
            last_updated_field: None,
            cover_image_field: None,
            related_titles_field: None,
        }
    }
}

impl DeclarativeConfig {
    /// Check required fields. Called once, before a connector is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("key", &self.key),
            ("name", &self.name),
            ("baseUrl", &self.base_url),
            ("search.path", &self.search.path),
            ("resolve.path", &self.resolve.path),
            ("response.idField", &self.response.id_field),
            ("response.titleField", &self.response.title_field),
            ("response.urlField", &self.response.url_field),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "declarative connector {:?}: {} is required",
                    self.key, field
                )));
            }
        }

        let base = self.parsed_base_url()?;
        if base.host_str().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "declarative connector {:?}: baseUrl has no host",
                self.key
            )));
        }
        Ok(())
    }

    pub fn parsed_base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(self.base_url.trim()).map_err(|e| {
            ConfigError::ValidationError(format!(
                "declarative connector {:?}: invalid baseUrl {:?}: {}",
                self.key, self.base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::ValidationError(format!(
                "declarative connector {:?}: baseUrl must be http(s)",
                self.key
            )));
        }
        Ok(url)
    }

    /// Allowed hosts after defaulting to the base URL host.
    pub fn effective_hosts(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .allowed_hosts
            .iter()
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .collect();
        if !configured.is_empty() {
            return configured;
        }
        self.parsed_base_url()
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .into_iter()
            .collect()
    }
}
