//! MangaGeko (www.mgeko.cc).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use tracing::debug;

use super::{parse_listing, ListingRules, NativeOptions};
use crate::connector::{Connector, ConnectorError, ConnectorKind, MangaResult};
use crate::context::CallContext;
use crate::extract::{
    find_chapter_href, layered_search, parse_item_url, scan_anchors, AliasRules, DateWindow,
    HostAllowList, ItemRules, LocatorChain, SearchSource, SitemapCatalog, TitleRules,
};
use crate::resilience::{CatalogCache, CatalogEntry, ContentKind, HttpFetcher};

const BASE_URL: &str = "https://www.mgeko.cc/";

static ITEM_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/manga/([a-z0-9][a-z0-9-]*)/?$").expect("mgeko item path"));

static CHAPTER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(?P<href>[^"]*-chapter-(?P<num>\d+(?:-\d+)?)(?:-[a-z]+)*/?)""#)
        .expect("mgeko chapter anchor")
});

const LISTING: ListingRules = ListingRules {
    item: "li.novel-item",
    link: "a",
    title: "h4.novel-title",
    cover: "img",
};

pub struct MgekoConnector {
    base: Url,
    hosts: HostAllowList,
    fetcher: HttpFetcher,
    rules: ItemRules,
    sitemap: SitemapCatalog,
}

impl MgekoConnector {
    pub const KEY: &'static str = "mgeko";

    pub fn new(options: &NativeOptions) -> Result<Self, ConnectorError> {
        let base = Url::parse(BASE_URL)
            .map_err(|e| ConnectorError::InvalidInput(format!("bad base URL: {}", e)))?;

        let rules = ItemRules {
            title: TitleRules::new(
                LocatorChain::new()
                    .meta("og-title", "og:title")
                    .text("novel-title", "h1.novel-title")
                    .text("document-title", "title"),
            )
            .with_suffixes([" - MangaGeko", " | MangaGeko", " - Mgeko", " Manga Online", " Manga"])
            .with_prefixes(["Read "]),
            cover: LocatorChain::new()
                .meta("og-image", "og:image")
                .attr("cover-lazy", "figure.cover img", "data-src")
                .attr("cover-src", "figure.cover img", "src"),
            aliases: AliasRules {
                labeled: true,
                embedded_json: false,
                adjacent: LocatorChain::new().text("alternative-title", "h2.alternative-title"),
            },
            chapter_anchor: &CHAPTER_ANCHOR,
            date_window: DateWindow::default(),
        };

        let sitemap = SitemapCatalog::new(
            format!("{}sitemap.xml", BASE_URL),
            &["manga"],
            &ITEM_PATH,
            CatalogCache::new(options.catalog_ttl),
        );

        Ok(Self {
            fetcher: options.fetcher(Self::KEY, &base),
            hosts: HostAllowList::new(["mgeko.cc", "mgeko.com", "mangageko.com"]),
            base,
            rules,
            sitemap,
        })
    }

    fn canonical_url(slug: &str) -> String {
        format!("{}manga/{}/", BASE_URL, slug)
    }

    async fn resolve_slug(&self, ctx: &CallContext, slug: &str) -> Result<MangaResult, ConnectorError> {
        let url = Self::canonical_url(slug);
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        let page = self.rules.extract(&raw, &self.base, slug, Utc::now());
        if page.is_empty() {
            return Err(ConnectorError::NotFound(url));
        }
        Ok(page.into_result(Self::KEY, slug, &url))
    }
}

#[async_trait]
impl Connector for MgekoConnector {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn name(&self) -> &str {
        "MangaGeko"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Native
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), ConnectorError> {
        self.fetcher.fetch(ctx, BASE_URL, ContentKind::Html).await?;
        Ok(())
    }

    async fn resolve_by_url(&self, ctx: &CallContext, url: &str) -> Result<MangaResult, ConnectorError> {
        let (_, slug) = parse_item_url(Self::KEY, url, &self.hosts, &ITEM_PATH)?;
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
        let (_, slug) = parse_item_url(Self::KEY, url, &self.hosts, &ITEM_PATH)?;

        let list_url = format!("{}all-chapters/", Self::canonical_url(&slug));
        let raw = self.fetcher.fetch_text(ctx, &list_url, ContentKind::Html).await?;
        let anchors = scan_anchors(&raw, &CHAPTER_ANCHOR);
        debug!(connector = Self::KEY, anchors = anchors.len(), "Scanned chapter list");

        find_chapter_href(&anchors, chapter, &self.base)
            .ok_or_else(|| ConnectorError::NotFound(format!("chapter {} of {}", chapter, slug)))
    }
}

#[async_trait]
impl SearchSource for MgekoConnector {
    fn source_key(&self) -> &str {
        Self::KEY
    }

    async fn search_listing(
        &self,
        ctx: &CallContext,
        query: &str,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        let url = format!("{}search/?search={}", BASE_URL, urlencoding::encode(query));
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        Ok(parse_listing(&raw, &LISTING, &self.base)
            .into_iter()
            .filter_map(|hit| {
                let slug = ITEM_PATH
                    .captures(hit.href.path())?
                    .get(1)?
                    .as_str()
                    .to_string();
                let mut result =
                    MangaResult::new(Self::KEY, slug.as_str(), hit.title, Self::canonical_url(&slug));
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
