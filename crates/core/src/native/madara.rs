//! WordPress sites running the Madara manga theme.
//!
//! `manhuaus` is built in; further Madara sites are added from config.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{parse_listing, ListingRules, NativeOptions};
use crate::connector::{Connector, ConnectorError, ConnectorKind, MangaResult};
use crate::context::CallContext;
use crate::extract::{
    find_chapter_href, layered_search, parse_item_url, scan_anchors, AliasRules, DateWindow,
    HostAllowList, ItemRules, LocatorChain, SearchSource, SitemapCatalog, TitleRules,
};
use crate::resilience::{CatalogCache, CatalogEntry, ContentKind, HttpFetcher};

static ITEM_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/manga/([^/]+)/?$").expect("madara item path"));

static CHAPTER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(?P<href>[^"]*/chapter-(?P<num>\d+(?:[-.]\d+)?)[^"/]*/?)""#)
        .expect("madara chapter anchor")
});

/// `Alternative` heading followed by its summary-content cell.
static ALTERNATIVE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<h5>\s*Alternative\s*</h5>\s*</div>\s*<div class="summary-content">(.*?)</div>"#,
    )
    .expect("madara alternative block")
});

const LISTING: ListingRules = ListingRules {
    item: "div.c-tabs-item__content, div.page-item-detail",
    link: "div.post-title a, h3 a, a",
    title: "div.post-title, h3",
    cover: "img",
};

/// A Madara site definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MadaraSite {
    pub key: String,
    pub name: String,
    pub base_url: String,
}

impl MadaraSite {
    pub fn manhuaus() -> Self {
        Self {
            key: "manhuaus".to_string(),
            name: "Manhuaus".to_string(),
            base_url: "https://manhuaus.com/".to_string(),
        }
    }
}

pub struct MadaraConnector {
    site: MadaraSite,
    base: Url,
    hosts: HostAllowList,
    fetcher: HttpFetcher,
    rules: ItemRules,
    sitemap: SitemapCatalog,
}

impl MadaraConnector {
    pub fn new(site: MadaraSite, options: &NativeOptions) -> Result<Self, ConnectorError> {
        let mut base = Url::parse(site.base_url.trim()).map_err(|e| {
            ConnectorError::InvalidInput(format!("bad base URL {:?}: {}", site.base_url, e))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let host = base
            .host_str()
            .ok_or_else(|| ConnectorError::InvalidInput(format!("base URL has no host: {}", base)))?
            .to_string();

        let rules = ItemRules {
            title: TitleRules::new(
                LocatorChain::new()
                    .meta("og-title", "og:title")
                    .text("post-title", "div.post-title h1")
                    .text("document-title", "title"),
            )
            .with_suffixes([
                format!(" - {}", site.name),
                format!(" \u{2013} {}", site.name),
                format!(" | {}", site.name),
                format!(" - {}", host),
                " Manga".to_string(),
            ])
            .with_prefixes(["Read "]),
            cover: LocatorChain::new()
                .meta("og-image", "og:image")
                .attr("summary-lazy", "div.summary_image img", "data-src")
                .attr("summary-src", "div.summary_image img", "src"),
            aliases: AliasRules {
                labeled: true,
                embedded_json: false,
                adjacent: LocatorChain::new().pattern("alternative-block", &ALTERNATIVE_BLOCK),
            },
            chapter_anchor: &CHAPTER_ANCHOR,
            date_window: DateWindow::default(),
        };

        let sitemap = SitemapCatalog::new(
            base.join("sitemap_index.xml")
                .map_err(|e| ConnectorError::InvalidInput(e.to_string()))?
                .to_string(),
            &["wp-manga"],
            &ITEM_PATH,
            CatalogCache::new(options.catalog_ttl),
        );

        Ok(Self {
            fetcher: options.fetcher(&site.key, &base),
            hosts: HostAllowList::new([host]),
            site,
            base,
            rules,
            sitemap,
        })
    }

    fn canonical_url(&self, slug: &str) -> String {
        format!("{}manga/{}/", self.base, slug)
    }

    async fn resolve_slug(&self, ctx: &CallContext, slug: &str) -> Result<MangaResult, ConnectorError> {
        let url = self.canonical_url(slug);
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        let page = self.rules.extract(&raw, &self.base, slug, Utc::now());
        if page.is_empty() {
            return Err(ConnectorError::NotFound(url));
        }
        Ok(page.into_result(&self.site.key, slug, &url))
    }
}

#[async_trait]
impl Connector for MadaraConnector {
    fn key(&self) -> &str {
        &self.site.key
    }

    fn name(&self) -> &str {
        &self.site.name
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Native
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), ConnectorError> {
        self.fetcher.fetch(ctx, self.base.as_str(), ContentKind::Html).await?;
        Ok(())
    }

    async fn resolve_by_url(&self, ctx: &CallContext, url: &str) -> Result<MangaResult, ConnectorError> {
        let (_, slug) = parse_item_url(&self.site.key, url, &self.hosts, &ITEM_PATH)?;
        self.resolve_slug(ctx, &slug).await
    }

    async fn search_by_title(
        &self,
        ctx: &CallContext,
        query: &str,
        limit: usize,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        layered_search(self, ctx, query, limit).await
    }

    fn supports_chapter_urls(&self) -> bool {
        true
    }

    async fn resolve_chapter_url(
        &self,
        ctx: &CallContext,
        url: &str,
        chapter: f64,
    ) -> Result<String, ConnectorError> {
        if !chapter.is_finite() || chapter < 0.0 {
            return Err(ConnectorError::InvalidInput(format!("invalid chapter {}", chapter)));
        }
        let (_, slug) = parse_item_url(&self.site.key, url, &self.hosts, &ITEM_PATH)?;

        let raw = self
            .fetcher
            .fetch_text(ctx, &self.canonical_url(&slug), ContentKind::Html)
            .await?;
        let anchors = scan_anchors(&raw, &CHAPTER_ANCHOR);
        find_chapter_href(&anchors, chapter, &self.base)
            .ok_or_else(|| ConnectorError::NotFound(format!("chapter {} of {}", chapter, slug)))
    }
}

#[async_trait]
impl SearchSource for MadaraConnector {
    fn source_key(&self) -> &str {
        &self.site.key
    }

    async fn search_listing(
        &self,
        ctx: &CallContext,
        query: &str,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        let url = format!(
            "{}?s={}&post_type=wp-manga",
            self.base,
            urlencoding::encode(query)
        );
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        Ok(parse_listing(&raw, &LISTING, &self.base)
            .into_iter()
            .filter(|hit| self.hosts.allows(hit.href.host_str().unwrap_or_default()))
            .filter_map(|hit| {
                let slug = ITEM_PATH
                    .captures(hit.href.path())?
                    .get(1)?
                    .as_str()
                    .to_string();
                let mut result = MangaResult::new(
                    self.site.key.as_str(),
                    slug.as_str(),
                    hit.title,
                    self.canonical_url(&slug),
                );
                result.cover_image_url = hit.cover;
                Some(result)
            })
            .collect())
    }

    async fn catalog(
        &self,
        ctx: &CallContext,
    ) -> Option<Result<Arc<Vec<CatalogEntry>>, ConnectorError>> {
        Some(self.sitemap.entries(ctx, &self.fetcher).await)
    }

    async fn verify(
        &self,
        ctx: &CallContext,
        entry: &CatalogEntry,
    ) -> Result<MangaResult, ConnectorError> {
        self.resolve_slug(ctx, &entry.id).await
    }
}
