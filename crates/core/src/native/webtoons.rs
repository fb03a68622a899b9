//! LINE Webtoon (www.webtoons.com).
//!
//! Items are addressed by the numeric `title_no` query parameter. The
//! episode list is paginated newest-first, ten episodes per page.

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
    find_chapter_href, layered_search, parse_site_url, scan_anchors, AliasRules, ChapterAnchor,
    DateWindow, HostAllowList, ItemRules, LocatorChain, SearchSource, TitleRules,
};
use crate::resilience::{CatalogEntry, ContentKind, HttpFetcher};

const BASE_URL: &str = "https://www.webtoons.com/";

/// Episodes per list page.
pub const EPISODES_PER_PAGE: f64 = 10.0;

static LIST_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/([a-z]{2}(?:-[a-z]+)?)/([a-z0-9-]+)/([a-z0-9-]+)/list/?$")
        .expect("webtoons list path")
});

static EPISODE_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"href="(?P<href>[^"]*/viewer\?title_no=\d+&(?:amp;)?episode_no=(?P<num>\d+)[^"]*)""#)
        .expect("webtoons episode anchor")
});

const LISTING: ListingRules = ListingRules {
    item: "ul.card_lst li, ul.webtoon_list li",
    link: "a",
    title: ".subj, .title",
    cover: "img",
};

/// Path parts of a series list URL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SeriesPath {
    lang: String,
    genre: String,
    slug: String,
    title_no: String,
}

impl SeriesPath {
    fn from_url(url: &Url) -> Option<Self> {
        let caps = LIST_PATH.captures(url.path())?;
        let title_no = url
            .query_pairs()
            .find(|(k, _)| k == "title_no")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))?;
        Some(Self {
            lang: caps.get(1)?.as_str().to_string(),
            genre: caps.get(2)?.as_str().to_string(),
            slug: caps.get(3)?.as_str().to_string(),
            title_no,
        })
    }

    fn list_url(&self) -> String {
        format!(
            "{}{}/{}/{}/list?title_no={}",
            BASE_URL, self.lang, self.genre, self.slug, self.title_no
        )
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}&page={}", self.list_url(), page)
    }
}

/// List page expected to hold `chapter`, given the newest chapter number.
pub fn estimate_page(latest: f64, chapter: f64) -> u32 {
    let gap = (latest - chapter).max(0.0);
    ((gap / EPISODES_PER_PAGE).floor() as u32).saturating_add(1)
}

pub struct WebtoonsConnector {
    base: Url,
    hosts: HostAllowList,
    fetcher: HttpFetcher,
    rules: ItemRules,
}

impl WebtoonsConnector {
    pub const KEY: &'static str = "webtoons";

    pub fn new(options: &NativeOptions) -> Result<Self, ConnectorError> {
        let base = Url::parse(BASE_URL)
            .map_err(|e| ConnectorError::InvalidInput(format!("bad base URL: {}", e)))?;

        let rules = ItemRules {
            title: TitleRules::new(
                LocatorChain::new()
                    .meta("og-title", "og:title")
                    .text("subject", "h1.subj")
                    .text("document-title", "title"),
            )
            .with_suffixes([" | WEBTOON", " - WEBTOON", " | LINE WEBTOON"]),
            cover: LocatorChain::new()
                .meta("og-image", "og:image")
                .attr("detail-background", "div.detail_bg img", "src"),
            aliases: AliasRules::default(),
            chapter_anchor: &EPISODE_ANCHOR,
            date_window: DateWindow {
                before: 200,
                after: 1000,
            },
        };

        Ok(Self {
            fetcher: options.fetcher(Self::KEY, &base),
            hosts: HostAllowList::new(["webtoons.com"]),
            base,
            rules,
        })
    }

    fn parse_series(&self, raw: &str) -> Result<SeriesPath, ConnectorError> {
        let url = parse_site_url(Self::KEY, raw, &self.hosts)?;
        SeriesPath::from_url(&url).ok_or_else(|| ConnectorError::FormatMismatch(raw.trim().to_string()))
    }

    async fn resolve_series(
        &self,
        ctx: &CallContext,
        series: &SeriesPath,
    ) -> Result<MangaResult, ConnectorError> {
        let url = series.list_url();
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        let page = self.rules.extract(&raw, &self.base, &series.slug, Utc::now());
        if page.is_empty() {
            return Err(ConnectorError::NotFound(url));
        }
        Ok(page.into_result(Self::KEY, &series.title_no, &url))
    }

    async fn episode_page(
        &self,
        ctx: &CallContext,
        series: &SeriesPath,
        page: u32,
    ) -> Result<Vec<ChapterAnchor>, ConnectorError> {
        let raw = self
            .fetcher
            .fetch_text(ctx, &series.page_url(page), ContentKind::Html)
            .await?;
        Ok(scan_anchors(&raw, &EPISODE_ANCHOR))
    }
}

#[async_trait]
impl Connector for WebtoonsConnector {
    fn key(&self) -> &str {
        Self::KEY
    }

    fn name(&self) -> &str {
        "WEBTOON"
    }

    fn kind(&self) -> ConnectorKind {
        ConnectorKind::Native
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<(), ConnectorError> {
        self.fetcher.fetch(ctx, BASE_URL, ContentKind::Html).await?;
        Ok(())
    }

    async fn resolve_by_url(&self, ctx: &CallContext, url: &str) -> Result<MangaResult, ConnectorError> {
        let series = self.parse_series(url)?;
        self.resolve_series(ctx, &series).await
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
        let series = self.parse_series(url)?;
        let not_found =
            || ConnectorError::NotFound(format!("episode {} of {}", chapter, series.title_no));

        let first = self.episode_page(ctx, &series, 1).await?;
        if let Some(href) = find_chapter_href(&first, chapter, &self.base) {
            return Ok(href);
        }

        let latest = first
            .iter()
            .map(|a| a.number)
            .fold(None, |acc: Option<f64>, n| Some(acc.map_or(n, |m| m.max(n))))
            .ok_or_else(not_found)?;
        if chapter > latest {
            return Err(not_found());
        }

        let page = estimate_page(latest, chapter);
        if page <= 1 {
            return Err(not_found());
        }
        debug!(connector = Self::KEY, latest, chapter, page, "Jumping to estimated episode page");

        let anchors = self.episode_page(ctx, &series, page).await?;
        find_chapter_href(&anchors, chapter, &self.base).ok_or_else(not_found)
    }
}

#[async_trait]
impl SearchSource for WebtoonsConnector {
    fn source_key(&self) -> &str {
        Self::KEY
    }

    async fn search_listing(
        &self,
        ctx: &CallContext,
        query: &str,
    ) -> Result<Vec<MangaResult>, ConnectorError> {
        let url = format!("{}en/search?keyword={}", BASE_URL, urlencoding::encode(query));
        let raw = self.fetcher.fetch_text(ctx, &url, ContentKind::Html).await?;

        Ok(parse_listing(&raw, &LISTING, &self.base)
            .into_iter()
            .filter_map(|hit| {
                let series = SeriesPath::from_url(&hit.href)?;
                let mut result =
                    MangaResult::new(Self::KEY, series.title_no.as_str(), hit.title, series.list_url());
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
        let series = self.parse_series(&entry.url)?;
        self.resolve_series(ctx, &series).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_path() {
        let url = Url::parse("https://www.webtoons.com/en/fantasy/tower-of-god/list?title_no=95&page=3")
            .unwrap();
        let series = SeriesPath::from_url(&url).unwrap();
        assert_eq!(series.title_no, "95");
        assert_eq!(series.slug, "tower-of-god");
        assert_eq!(
            series.list_url(),
            "https://www.webtoons.com/en/fantasy/tower-of-god/list?title_no=95"
        );
        assert_eq!(
            series.page_url(2),
            "https://www.webtoons.com/en/fantasy/tower-of-god/list?title_no=95&page=2"
        );

        let url = Url::parse("https://www.webtoons.com/en/fantasy/tower-of-god/list").unwrap();
        assert!(SeriesPath::from_url(&url).is_none());
    }

    #[test]
    fn test_estimate_page() {
        assert_eq!(estimate_page(640.0, 640.0), 1);
        assert_eq!(estimate_page(640.0, 631.0), 1);
        assert_eq!(estimate_page(640.0, 630.0), 2);
        assert_eq!(estimate_page(640.0, 615.0), 3);
        assert_eq!(estimate_page(640.0, 1.0), 64);
        assert_eq!(estimate_page(1e12, 0.0), u32::MAX);
    }
}
