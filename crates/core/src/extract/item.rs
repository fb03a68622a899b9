//! Item-page extraction: the per-site rules applied in pipeline order.

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use reqwest::Url;

use super::aliases::AliasRules;
use super::chapters::{latest_chapter, scan_anchors, DateWindow, LatestChapter};
use super::cover::extract_cover;
use super::locator::{LocatorChain, Page};
use super::text::prettify_identifier;
use super::title::TitleRules;
use crate::connector::MangaResult;

/// Everything a native connector needs to read one item page.
#[derive(Debug, Clone)]
pub struct ItemRules {
    pub title: TitleRules,
    pub cover: LocatorChain,
    pub aliases: AliasRules,
    /// Chapter link pattern with named groups `num` and optionally `href`.
    pub chapter_anchor: &'static Regex,
    pub date_window: DateWindow,
}

/// Fields pulled from an item page.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemPage {
    pub title: String,
    /// False when the title came from the identifier fallback.
    pub title_found: bool,
    pub related_titles: Vec<String>,
    pub cover_image_url: String,
    pub latest: Option<LatestChapter>,
}

impl ItemPage {
    /// A page with neither a title nor chapters is not an item page.
    pub fn is_empty(&self) -> bool {
        !self.title_found && self.latest.is_none()
    }

    pub fn into_result(self, source_key: &str, source_item_id: &str, url: &str) -> MangaResult {
        let mut result = MangaResult::new(source_key, source_item_id, self.title, url);
        result.set_related_titles(self.related_titles);
        result.cover_image_url = self.cover_image_url;
        if let Some(latest) = self.latest {
            result.latest_chapter = Some(latest.number);
            result.last_updated_at = latest.updated_at;
        }
        result
    }
}

impl ItemRules {
    /// Run the pipeline over `raw`. Missing optional fields stay empty.
    pub fn extract(&self, raw: &str, base: &Url, fallback_id: &str, now: DateTime<Utc>) -> ItemPage {
        let page = Page::parse(raw);

        let found = self.title.find(&page);
        let title_found = found.is_some();
        let title = found.unwrap_or_else(|| prettify_identifier(fallback_id));

        let cover_image_url = extract_cover(&page, &self.cover, base);
        let related_titles = self.aliases.extract(&page, &title);

        let anchors = scan_anchors(raw, self.chapter_anchor);
        let latest = latest_chapter(raw, &anchors, self.date_window, now);

        ItemPage {
            title,
            title_found,
            related_titles,
            cover_image_url,
            latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use once_cell::sync::Lazy;

    static ANCHOR: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"href="(?P<href>[^"]*/chapter-(?P<num>\d+(?:-\d+)?)/?)""#).unwrap()
    });

    fn rules() -> ItemRules {
        ItemRules {
            title: TitleRules::new(LocatorChain::new().meta("og-title", "og:title"))
                .with_suffixes([" - Example"]),
            cover: LocatorChain::new().meta("og-image", "og:image"),
            aliases: AliasRules {
                labeled: true,
                ..AliasRules::default()
            },
            chapter_anchor: &ANCHOR,
            date_window: DateWindow::default(),
        }
    }

    #[test]
    fn test_full_page() {
        let raw = r#"<html><head>
            <meta property="og:title" content="Nano Machine - Example">
            <meta property="og:image" content="/covers/nano.jpg">
            </head><body>
            <p>Alternative Names: Nano Mashin; Nanomachine</p>
            <a href="/m/nano-machine/chapter-200/">200</a> <span>Apr 2, 2024</span>
            <a href="/m/nano-machine/chapter-199/">199</a>
            </body></html>"#;
        let base = Url::parse("https://example.test/").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        let page = rules().extract(raw, &base, "nano-machine", now);
        assert!(page.title_found);
        assert!(!page.is_empty());

        let result = page.into_result("example", "nano-machine", "https://example.test/m/nano-machine/");
        assert_eq!(result.title, "Nano Machine");
        assert_eq!(result.related_titles, vec!["Nano Mashin", "Nanomachine"]);
        assert_eq!(result.cover_image_url, "https://example.test/covers/nano.jpg");
        assert_eq!(result.latest_chapter, Some(200.0));
        assert_eq!(
            result.last_updated_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_sparse_page_keeps_optional_fields_empty() {
        let base = Url::parse("https://example.test/").unwrap();
        let page = rules().extract("<html><body>gone</body></html>", &base, "some-slug", Utc::now());
        assert!(page.is_empty());
        assert_eq!(page.title, "Some Slug");
        assert_eq!(page.cover_image_url, "");
        assert!(page.latest.is_none());
    }
}
