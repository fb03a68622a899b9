//! Built-in scraping connectors.
//!
//! Each connector is the shared extraction pipeline instantiated with one
//! site's locator table and quirks.

mod asura;
mod madara;
mod mgeko;
mod webtoons;

pub use asura::AsuraConnector;
pub use madara::{MadaraConnector, MadaraSite};
pub use mgeko::MgekoConnector;
pub use webtoons::WebtoonsConnector;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

use crate::extract::{element_text, resolve_image_url, Page};
use crate::resilience::{FetchSettings, HttpFetcher, Transport};

/// Construction parameters shared by native connectors.
#[derive(Clone)]
pub struct NativeOptions {
    pub transport: Arc<dyn Transport>,
    pub fetch: FetchSettings,
    /// Lifetime of a cached sitemap catalog.
    pub catalog_ttl: Duration,
}

impl NativeOptions {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            fetch: FetchSettings::default(),
            catalog_ttl: Duration::from_secs(30 * 60),
        }
    }

    /// Fetcher that sends `referer` with every request.
    pub(crate) fn fetcher(&self, key: &str, referer: &Url) -> HttpFetcher {
        HttpFetcher::new(key, self.transport.clone(), self.fetch.clone()).with_referer(referer.as_str())
    }
}

/// Where results live on a site's search/listing page.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListingRules {
    /// One element per result.
    pub item: &'static str,
    /// Link to the item page, inside `item`; empty when `item` is the link.
    pub link: &'static str,
    /// Title text inside `item`; falls back to the link's `title` attribute
    /// and then its text.
    pub title: &'static str,
    /// Cover `<img>` inside `item`.
    pub cover: &'static str,
}

/// One raw result from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListingHit {
    /// Absolute item URL.
    pub href: Url,
    pub title: String,
    pub cover: String,
}

pub(crate) fn parse_listing(raw: &str, rules: &ListingRules, base: &Url) -> Vec<ListingHit> {
    let page = Page::parse(raw);
    let mut hits = Vec::new();

    for item in page.select(rules.item) {
        let link = if rules.link.is_empty() {
            Some(item)
        } else {
            select_in(&item, rules.link).into_iter().next()
        };
        let Some(link) = link else { continue };
        let Some(href) = link.value().attr("href").and_then(|h| base.join(h.trim()).ok()) else {
            continue;
        };

        let title = select_in(&item, rules.title)
            .first()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .or_else(|| link.value().attr("title").map(|t| t.trim().to_string()))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| element_text(&link));

        let cover = select_in(&item, rules.cover)
            .first()
            .and_then(|img| {
                ["data-src", "data-lazy-src", "src"]
                    .iter()
                    .filter_map(|a| img.value().attr(a))
                    .find_map(|v| resolve_image_url(v, base))
            })
            .unwrap_or_default();

        hits.push(ListingHit { href, title, cover });
    }

    hits
}

fn select_in<'a>(el: &scraper::ElementRef<'a>, css: &str) -> Vec<scraper::ElementRef<'a>> {
    if css.is_empty() {
        return Vec::new();
    }
    match scraper::Selector::parse(css) {
        Ok(selector) => el.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULES: ListingRules = ListingRules {
        item: "li.novel-item",
        link: "a",
        title: "h4.novel-title",
        cover: "img",
    };

    #[test]
    fn test_parse_listing() {
        let html = r#"<ul>
            <li class="novel-item"><a href="/manga/solo-leveling/" title="Solo Leveling">
                <img data-src="/media/solo.jpg" src="data:image/gif;base64,AA">
                <h4 class="novel-title"> Solo  Leveling </h4></a></li>
            <li class="novel-item"><a href="/manga/no-title/" title="Attr Title"></a></li>
            <li class="novel-item"><span>no link</span></li>
        </ul>"#;
        let base = Url::parse("https://www.mgeko.cc/").unwrap();
        let hits = parse_listing(html, &RULES, &base);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].href.as_str(), "https://www.mgeko.cc/manga/solo-leveling/");
        assert_eq!(hits[0].title, "Solo Leveling");
        assert_eq!(hits[0].cover, "https://www.mgeko.cc/media/solo.jpg");
        assert_eq!(hits[1].title, "Attr Title");
        assert_eq!(hits[1].cover, "");
    }
}
