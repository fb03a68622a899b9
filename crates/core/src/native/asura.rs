//! Asura Scans (asuracomic.net).

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;

use super::{parse_listing, ListingRules, NativeOptions};
use crate::connector::{Connector, ConnectorError, ConnectorKind, MangaResult};
use crate::context::CallContext;
use crate::extract::{
    find_chapter_href, layered_search, parse_item_url, scan_anchors, AliasRules, DateWindow,
    HostAllowList, ItemRules, LocatorChain, SearchSource, TitleRules,
};
use crate::resilience::{CatalogEntry, ContentKind, HttpFetcher};

const BASE_URL: &str = "https://asuracomic.net/";

static ITEM_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/series/([a-z0-9][a-z0-9-]*)/?$").expect("asura item path"));

/// Random suffix Asura appends to slugs, e.g. `-7f873ca6`.
static SLUG_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-[0-9a-f]{8}$").expect("asura slug suffix"));

static CHAPTER_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(?P<href>[^"]*chapter/(?P<num>\d+(?:[.-]\d+)?))/?""#)
        .expect("asura chapter anchor")
});

const LISTING: ListingRules = ListingRules {
    item: r#"a[href*="series/"]"#,
    link: "",
    title: "span.block.font-bold",
    cover: "img",
};

pub struct AsuraConnector {
    base: Url,
    hosts: HostAllowList,
    fetcher: HttpFetcher,
    rules: ItemRules,
}

/// Slug without Asura's rotating hex suffix.
pub(crate) fn stable_slug(slug: &str) -> &str {
    match SLUG_SUFFIX.find(slug) {
        Some(m) if m.start() > 0 => &slug[..m.start()],
        _ => slug,
    }
}

impl AsuraConnector {
    pub const KEY: &'static str = "asura";

    pub fn new(options: &NativeOptions) -> Result<Self, ConnectorError> {
        let base = Url::parse(BASE_URL)
            .map_err(|e| ConnectorError::InvalidInput(format!("bad base URL: {}", e)))?;

        let rules = ItemRules {
            title: TitleRules::new(
                LocatorChain::new()
                    .meta("og-title", "og:title")
                    .text("series-heading", "span.text-xl.font-bold")
                    .text("document-title", "title"),
            )
            .with_suffixes([" - Asura Scans", " | Asura Scans", " - Asura Comic"]),
            cover: LocatorChain::new()
                .meta("og-image", "og:image")
                .attr("poster", r#"img[alt="poster"]"#, "src"),
            aliases: AliasRules {
                labeled: true,
                embedded_json: true,
                adjacent: LocatorChain::new(),
            },
            chapter_anchor: &CHAPTER_ANCHOR,
            date_window: DateWindow {
                before: 300,
                after: 1200,
            },
        };

        Ok(Self {
            fetcher: options.fetcher(Self::KEY, &base),
            hosts: HostAllowList::new(["asuracomic.net", "asurascans.com"]),
            base,
            rules,
        })
    }

    fn canonical_url(slug: &str) -> String {
        format!("{}series/{}", BASE_URL, slug)
    }

    async fn resolve_slug(&self, ctx: &CallContext, slug: &str) -> Result<MangaResult, ConnectorError> {
        let url = Self::canonical_url(slug);
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        let page = self.rules.extract(&raw, &self.base, stable_slug(slug), Utc::now());
        if page.is_empty() {
            return Err(ConnectorError::NotFound(url));
        }
        Ok(page.into_result(Self::KEY, slug, &url))
    }
}

#[async_trait]
impl Connector for AsuraConnector {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn name(&self) -> &str {
        "Asura Scans"
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

        let series_url = Self::canonical_url(&slug);
        let raw = self.fetcher.fetch_text(ctx, &series_url, ContentKind::Html).await?;
        let anchors = scan_anchors(&raw, &CHAPTER_ANCHOR);

        // Chapter hrefs are relative to /series/.
        let series_base = self
            .base
            .join("series/")
            .map_err(|e| ConnectorError::Decode(e.to_string()))?;
        find_chapter_href(&anchors, chapter, &series_base)
            .ok_or_else(|| ConnectorError::NotFound(format!("chapter {} of {}", chapter, slug)))
    }
}

#[async_trait]
impl SearchSource for AsuraConnector {
    fn source_key(&self) -> &str {
        Self::KEY
    }

    async fn search_listing(
        &self,
        ctx: &CallContext,
        query: &str,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        let url = format!("{}series?page=1&name={}", BASE_URL, urlencoding::encode(query));
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

    async fn verify(
        &self,
        ctx: &CallContext,
        entry: &CatalogEntry,
    ) -> Result<MangaResult, ConnectorError> {
        self.resolve_slug(ctx, &entry.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_slug() {
        assert_eq!(stable_slug("solo-leveling-7f873ca6"), "solo-leveling");
        assert_eq!(stable_slug("solo-leveling"), "solo-leveling");
        assert_eq!(stable_slug("deadbeef"), "deadbeef");
    }
}
