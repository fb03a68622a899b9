//! Cover image extraction and proxy unwrapping.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;

use super::locator::{LocatorChain, Page};

static WP_PROXY_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^i\d+\.wp\.com$").expect("wp proxy pattern"));

/// Absolute cover URL from the first matching locator, or empty.
pub fn extract_cover(page: &Page, chain: &LocatorChain, base: &Url) -> String {
    chain
        .all(page)
        .iter()
        .find_map(|raw| resolve_image_url(raw, base))
        .unwrap_or_default()
}

/// Resolve `raw` against `base` and unwrap known image proxies.
///
/// Returns `None` for values that are not usable image URLs
/// (`data:` URIs, unparsable strings).
pub fn resolve_image_url(raw: &str, base: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    // srcset-style values: keep the first candidate.
    let raw = raw.split(", ").next().unwrap_or(raw);
    let raw = raw.split_whitespace().next().unwrap_or(raw);

    let url = base.join(raw).ok()?;
    Some(unwrap_proxy(url, base).to_string())
}

/// Peel image-optimizer and CDN-proxy wrappers off `url`.
pub fn unwrap_proxy(url: Url, base: &Url) -> Url {
    let mut current = url;
    // Proxies can nest.
    for _ in 0..3 {
        match unwrap_once(&current, base) {
            Some(inner) => current = inner,
            None => break,
        }
    }
    current
}

fn unwrap_once(url: &Url, base: &Url) -> Option<Url> {
    if url.path().ends_with("/_next/image") {
        let inner = url
            .query_pairs()
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.into_owned())?;
        return base.join(&inner).ok();
    }

    let host = url.host_str()?;
    if WP_PROXY_HOST.is_match(host) {
        let rest = url.path().trim_start_matches('/');
        if rest.is_empty() {
            return None;
        }
        return Url::parse(&format!("https://{}", rest)).ok();
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://asuracomic.net/").unwrap()
    }

    #[test]
    fn test_relative_url_is_resolved() {
        assert_eq!(
            resolve_image_url("/images/cover.webp", &base()).as_deref(),
            Some("https://asuracomic.net/images/cover.webp")
        );
        assert_eq!(
            resolve_image_url("//cdn.example.com/a.jpg", &base()).as_deref(),
            Some("https://cdn.example.com/a.jpg")
        );
    }

    #[test]
    fn test_next_image_is_unwrapped() {
        let raw = "/_next/image?url=https%3A%2F%2Fgg.asuracomic.net%2Fstorage%2Fmedia%2F1%2Fcover.webp&w=640&q=75";
        assert_eq!(
            resolve_image_url(raw, &base()).as_deref(),
            Some("https://gg.asuracomic.net/storage/media/1/cover.webp")
        );
    }

    #[test]
    fn test_wp_proxy_is_unwrapped() {
        let raw = "https://i0.wp.com/manhuaus.com/wp-content/uploads/2023/01/cover.jpg?resize=193,278&ssl=1";
        assert_eq!(
            resolve_image_url(raw, &base()).as_deref(),
            Some("https://manhuaus.com/wp-content/uploads/2023/01/cover.jpg")
        );
    }

    #[test]
    fn test_unusable_values() {
        assert!(resolve_image_url("", &base()).is_none());
        assert!(resolve_image_url("data:image/gif;base64,R0lGOD", &base()).is_none());
    }

    #[test]
    fn test_extract_cover_skips_placeholders() {
        let html = r#"<html><body>
            <img class="cover" src="data:image/gif;base64,AAAA" data-src="/c/real.jpg">
        </body></html>"#;
        let page = Page::parse(html);
        let chain = LocatorChain::new()
            .meta("og-image", "og:image")
            .attr("cover-src", "img.cover", "src")
            .attr("cover-lazy", "img.cover", "data-src");
        assert_eq!(
            extract_cover(&page, &chain, &base()),
            "https://asuracomic.net/c/real.jpg"
        );
        assert_eq!(extract_cover(&Page::parse("<p></p>"), &chain, &base()), "");
    }
}
