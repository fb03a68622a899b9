//! Schema-driven connector over an arbitrary JSON API.

mod config;
mod decode;
mod json_path;

pub use config::{DeclarativeConfig, ResolveEndpoint, ResponseShape, SearchEndpoint};
pub use decode::{chapter_number, decode_item, timestamp};
pub use json_path::walk;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::connector::{Connector, ConnectorError, ConnectorKind, MangaResult};
use crate::context::CallContext;
use crate::extract::{parse_site_url, HostAllowList, DEFAULT_SEARCH_LIMIT};
use crate::resilience::{ContentKind, FetchSettings, HttpFetcher, Transport};

/// Connector fully described by a [`DeclarativeConfig`].
pub struct DeclarativeConnector {
    config: DeclarativeConfig,
    base: Url,
    hosts: HostAllowList,
    fetcher: HttpFetcher,
}

impl std::fmt::Debug for DeclarativeConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeclarativeConnector")
            .field("key", &self.config.key)
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl DeclarativeConnector {
    /// Validate `config` and build the connector. An invalid config never
    /// produces a connector.
    pub fn new(
        config: DeclarativeConfig,
        transport: Arc<dyn Transport>,
        settings: FetchSettings,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let base = config.parsed_base_url()?;
        let hosts = HostAllowList::new(config.effective_hosts());
        let fetcher = HttpFetcher::new(config.key.clone(), transport, settings);

        Ok(Self {
            config,
            base,
            hosts,
            fetcher,
        })
    }

    pub fn config(&self) -> &DeclarativeConfig {
        &self.config
    }

    /// Build an endpoint URL from a configured path.
    ///
    /// `{name}` placeholders are replaced with URL-encoded values; values
    /// with no placeholder are appended as query parameters.
    fn endpoint(&self, path: &str, params: &[(&str, &str, String)]) -> Result<Url, ConnectorError> {
        let mut path = path.trim().to_string();
        let mut appended = Vec::new();
        for (placeholder, param, value) in params {
            let token = format!("{{{}}}", placeholder);
            if path.contains(&token) {
                path = path.replace(&token, &urlencoding::encode(value));
            } else {
                appended.push((*param, value.as_str()));
            }
        }

        let mut url = self.base.join(&path).map_err(|e| {
            ConnectorError::InvalidInput(format!("bad endpoint path {:?}: {}", path, e))
        })?;
        if !appended.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (param, value) in appended {
                pairs.append_pair(param, value);
            }
        }
        Ok(url)
    }

    async fn fetch_json(&self, ctx: &CallContext, url: &Url) -> Result<Value, ConnectorError> {
        self.fetcher.fetch_json(ctx, url.as_str()).await
    }
}

#[async_trait]
impl Connector for DeclarativeConnector {
    fn key(&self) -> &str {
        &self.config.key
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Declarative
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), ConnectorError> {
        let url = self.endpoint(&self.config.health_path, &[])?;
        self.fetcher.fetch(ctx, url.as_str(), ContentKind::Json).await?;
        Ok(())
    }

    async fn resolve_by_url(&self, ctx: &CallContext, url: &str) -> Result<MangaResult, ConnectorError> {
        let item_url = parse_site_url(&self.config.key, url, &self.hosts)?;

        let endpoint = self.endpoint(
            &self.config.resolve.path,
            &[(
                "url",
                self.config.resolve.url_param.as_str(),
                item_url.to_string(),
            )],
        )?;
        let doc = self.fetch_json(ctx, &endpoint).await?;

        let shape = &self.config.response;
        let item = walk(&doc, &shape.resolve_item_path)
            .filter(|v| !v.is_null())
            .ok_or_else(|| ConnectorError::NotFound(item_url.to_string()))?;
        decode_item(item, shape, &self.config.key, &self.base)
    }

    async fn search_by_title(
        &self,
        ctx: &CallContext,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ConnectorError::InvalidInput("empty search query".to_string()));
        }
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };

        let endpoint = self.endpoint(
            &self.config.search.path,
            &[
                ("query", self.config.search.query_param.as_str(), query.to_string()),
                ("limit", self.config.search.limit_param.as_str(), limit.to_string()),
            ],
        )?;
        let doc = self.fetch_json(ctx, &endpoint).await?;

        let shape = &self.config.response;
        let items = match walk(&doc, &shape.search_items_path) {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(_) => {
                return Err(ConnectorError::Decode(format!(
                    "{:?} is not a list",
                    shape.search_items_path
                )))
            }
        };

        let mut seen = HashSet::new();
        let mut results = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match decode_item(item, shape, &self.config.key, &self.base) {
                Ok(result) => {
                    if seen.insert(result.source_item_id.clone()) {
                        results.push(result);
                    }
                }
                Err(e) => {
                    warn!(connector = %self.config.key, index, error = %e, "Skipping undecodable search item");
                }
            }
            if results.len() >= limit {
                break;
            }
        }
        debug!(connector = %self.config.key, results = results.len(), "Declarative search done");
        Ok(results)
    }
}
