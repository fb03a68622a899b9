//! The extraction pipeline shared by native connectors.
//!
//! A native connector is a table of named locator steps plus a few site
//! quirks. The pieces here turn a fetched page into `MangaResult` fields:
//!
//! 1. identifier validation ([`parse_item_url`]) before any request
//! 2. title ([`TitleRules`]) with boilerplate stripping and slug fallback
//! 3. cover ([`extract_cover`]) with relative-URL and proxy handling
//! 4. latest chapter ([`latest_chapter`]) with a correlated date
//! 5. aliases ([`AliasRules`])
//!
//! [`ItemRules`] bundles these for one site.
//!
//! Search goes through [`layered_search`], which falls back to a cached
//! [`SitemapCatalog`].

mod aliases;
mod chapters;
mod cover;
mod dates;
mod identifier;
mod item;
mod locator;
mod search;
mod sitemap;
mod text;
mod title;

pub use aliases::AliasRules;
pub use chapters::{
    date_near, find_chapter_href, latest_chapter, parse_chapter_token, scan_anchors,
    ChapterAnchor, DateWindow, LatestChapter, CHAPTER_TOLERANCE,
};
pub use cover::{extract_cover, resolve_image_url, unwrap_proxy};
pub use dates::{find_dates, parse_date, DateMatch};
pub use identifier::{parse_item_url, parse_site_url, HostAllowList};
pub use item::{ItemPage, ItemRules};
pub use locator::{element_text, LocatorChain, LocatorStep, Page, Rule};
pub use search::{layered_search, SearchSource, DEFAULT_SEARCH_LIMIT};
pub use sitemap::{parse_locs, SitemapCatalog};
pub use text::{
    clean_fragment, collapse_whitespace, decode_entities, html_to_text, prettify_identifier,
};
pub use title::TitleRules;
