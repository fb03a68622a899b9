//! Connector abstraction.
//!
//! A `Connector` bridges one external site or API to a uniform
//! resolve/search contract. Native connectors scrape HTML; declarative
//! connectors are driven by configuration over a JSON API.

mod error;
mod types;

pub use error::ConnectorError;
pub use types::*;

use async_trait::async_trait;

use crate::context::CallContext;

/// Trait implemented by every site connector.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Short unique identifier used for registry lookup.
    fn key(&self) -> &str;

    /// Human-readable site name.
    fn name(&self) -> &str;

    fn kind(&self) -> ConnectorKind;

    /// Check that the site is reachable.
    async fn health_check(&self, ctx: &CallContext) -> Result<(), ConnectorError>;

    /// Resolve a canonical item page URL into a result.
    async fn resolve_by_url(
        &self,
        ctx: &CallContext,
        url: &str,
    ) -> Result<MangaResult, ConnectorError>;

    /// Search the site for items matching `query`, returning at most `limit`.
    async fn search_by_title(
        &self,
        ctx: &CallContext,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MangaResult>, ConnectorError>;

    /// Whether [`resolve_chapter_url`](Connector::resolve_chapter_url) is
    /// implemented.
    fn supports_chapter_urls(&self) -> bool {
        false
    }

    /// Return the reader URL for `chapter` of the item at `url`.
    async fn resolve_chapter_url(
        &self,
        _ctx: &CallContext,
        _url: &str,
        _chapter: f64,
    ) -> Result<String, ConnectorError> {
        Err(ConnectorError::Unsupported(format!(
            "{} does not resolve chapter URLs",
            self.key()
        )))
    }

    fn descriptor(&self) -> Descriptor {
        Descriptor {
            key: self.key().to_string(),
            name: self.name().to_string(),
            kind: self.kind(),
        }
    }
}
