//! Sitemap-backed catalog used as the last-resort search source.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use tracing::{debug, warn};

use super::text::decode_entities;
use crate::connector::ConnectorError;
use crate::context::CallContext;
use crate::resilience::{CatalogCache, CatalogEntry, ContentKind, HttpFetcher};

static LOC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<loc>\s*(?:<!\[CDATA\[)?\s*(.*?)\s*(?:\]\]>)?\s*</loc>").expect("loc pattern")
});

/// All `<loc>` values in a sitemap document.
pub fn parse_locs(xml: &str) -> Vec<String> {
    LOC.captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| decode_entities(m.as_str().trim()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Where a site's sitemap lives and how to read item URLs out of it.
pub struct SitemapCatalog {
    index_url: String,
    /// Sub-index URLs must contain one of these to be fetched; empty
    /// means every sub-index.
    sub_index_hints: &'static [&'static str],
    /// Matched against item URL paths; first capture group is the id.
    item_path: &'static Regex,
    cache: CatalogCache,
}

impl SitemapCatalog {
    pub fn new(
        index_url: impl Into<String>,
        sub_index_hints: &'static [&'static str],
        item_path: &'static Regex,
        cache: CatalogCache,
    ) -> Self {
        Self {
            index_url: index_url.into(),
            sub_index_hints,
            item_path,
            cache,
        }
    }

    pub fn index_url(&self) -> &str {
        &self.index_url
    }

    /// Cached catalog, rebuilt from the network when stale.
    pub async fn entries(
        &self,
        ctx: &CallContext,
        fetcher: &HttpFetcher,
    ) -> Result<Arc<Vec<CatalogEntry>>, ConnectorError> {
        self.cache.get_or_build(|| self.build(ctx, fetcher)).await
    }

    async fn build(
        &self,
        ctx: &CallContext,
        fetcher: &HttpFetcher,
    ) -> Result<Vec<CatalogEntry>, ConnectorError> {
        let index = fetcher.fetch_text(ctx, &self.index_url, ContentKind::Xml).await?;
        let locs = parse_locs(&index);

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        self.collect_items(&locs, &mut seen, &mut entries);

        let sub_indexes: Vec<&String> = locs
            .iter()
            .filter(|loc| is_sitemap_url(loc))
            .filter(|loc| {
                self.sub_index_hints.is_empty()
                    || self.sub_index_hints.iter().any(|hint| loc.contains(hint))
            })
            .collect();
        debug!(index = %self.index_url, sub_indexes = sub_indexes.len(), "Rebuilding sitemap catalog");

        for sub in sub_indexes {
            match fetcher.fetch_text(ctx, sub, ContentKind::Xml).await {
                Ok(xml) => self.collect_items(&parse_locs(&xml), &mut seen, &mut entries),
                Err(e) if e.is_cancellation() || e.is_rate_limited() => return Err(e),
                Err(e) => warn!(sitemap = %sub, error = %e, "Skipping sitemap sub-index"),
            }
        }

        Ok(entries)
    }

    fn collect_items(
        &self,
        locs: &[String],
        seen: &mut HashSet<String>,
        entries: &mut Vec<CatalogEntry>,
    ) {
        for loc in locs {
            if is_sitemap_url(loc) {
                continue;
            }
            let Some(id) = self.item_id(loc) else { continue };
            if seen.insert(id.clone()) {
                entries.push(CatalogEntry {
                    id,
                    url: loc.clone(),
                });
            }
        }
    }

    fn item_id(&self, loc: &str) -> Option<String> {
        let url = Url::parse(loc).ok()?;
        self.item_path
            .captures(url.path())
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

fn is_sitemap_url(loc: &str) -> bool {
    let path = loc.split(['?', '#']).next().unwrap_or(loc);
    path.ends_with(".xml") || path.ends_with(".xml.gz")
}
