//! Mock connector for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::connector::{Connector, ConnectorError, ConnectorKind, MangaResult};
use crate::context::CallContext;

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Health,
    Resolve(String),
    Search { query: String, limit: usize },
}

/// Mock implementation of the Connector trait.
///
/// Resolves URLs from a configured map, searches by case-insensitive
/// substring over configured results, and records every call.
///
/// # Example
///
/// ```rust,ignore
/// let connector = MockConnector::new("mgeko");
/// connector.add_result(fixtures::manga("mgeko", "solo-leveling", "Solo Leveling")).await;
///
/// let hits = connector.search_by_title(&ctx, "solo", 5).await?;
/// assert_eq!(hits.len(), 1);
/// ```
pub struct MockConnector {
    key: String,
    name: String,
    kind: ConnectorKind,
    results: Arc<RwLock<Vec<MangaResult>>>,
    by_url: Arc<RwLock<HashMap<String, MangaResult>>>,
    health_error: Arc<RwLock<Option<ConnectorError>>>,
    next_error: Arc<RwLock<Option<ConnectorError>>>,
    calls: Arc<RwLock<Vec<RecordedCall>>>,
}

impl std::fmt::Debug for MockConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnector")
            .field("key", &self.key)
            .field("kind", &self.kind)
            .field("results", &"<results>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl MockConnector {
    /// Create a healthy native connector with no results.
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            name: format!("Mock {}", key),
            kind: ConnectorKind::Native,
            results: Arc::new(RwLock::new(Vec::new())),
            by_url: Arc::new(RwLock::new(HashMap::new())),
            health_error: Arc::new(RwLock::new(None)),
            next_error: Arc::new(RwLock::new(None)),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_kind(mut self, kind: ConnectorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Add a result reachable by search and by its URL.
    pub async fn add_result(&self, result: MangaResult) {
        self.by_url
            .write()
            .await
            .insert(result.url.clone(), result.clone());
        self.results.write().await.push(result);
    }

    /// Make every health check fail with `error`.
    pub async fn set_health_error(&self, error: ConnectorError) {
        *self.health_error.write().await = Some(error);
    }

    /// Fail the next resolve or search with `error`.
    pub async fn set_next_error(&self, error: ConnectorError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    async fn record(&self, call: RecordedCall) -> Result<(), ConnectorError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn key(&self) -> &str {
        &self.key
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), ConnectorError> {
        ctx.check()?;
        self.calls.write().await.push(RecordedCall::Health);
        match self.health_error.read().await.as_ref() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn resolve_by_url(
        &self,
        ctx: &CallContext,
        url: &str,
    ) -> Result<MangaResult, ConnectorError> {
        ctx.check()?;
        self.record(RecordedCall::Resolve(url.to_string())).await?;
        self.by_url
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(url.to_string()))
    }

    async fn search_by_title(
        &self,
        ctx: &CallContext,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        ctx.check()?;
        self.record(RecordedCall::Search {
            query: query.to_string(),
            limit,
        })
        .await?;
        if query.trim().is_empty() {
            return Err(ConnectorError::InvalidInput("empty query".to_string()));
        }
        let needle = query.to_lowercase();
        Ok(self
            .results
            .read()
            .await
            .iter()
            .filter(|r| r.title.to_lowercase().contains(&needle))
            .take(limit.max(1))
            .cloned()
            .collect())
    }
}
