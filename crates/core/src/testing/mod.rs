//! Testing utilities and mock implementations.
//!
//! `MockTransport` stands in for the network so connectors can be exercised
//! end to end against fixture pages; `MockConnector` stands in for a whole
//! connector when testing the registry and callers.
//!
//! # Example
//!
//! ```rust,ignore
//! use mangawatch_core::testing::{fixtures, MockTransport};
//!
//! let transport = Arc::new(MockTransport::new());
//! transport
//!     .respond_ok("https://www.mgeko.cc/sitemap.xml", fixtures::urlset(&[
//!         "https://www.mgeko.cc/manga/solo-leveling/",
//!     ]))
//!     .await;
//!
//! let connector = MgekoConnector::new(&NativeOptions::new(transport.clone()))?;
//! ```

mod mock_connector;
mod mock_transport;

pub use mock_connector::{MockConnector, RecordedCall};
pub use mock_transport::{MockTransport, RecordedRequest};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::connector::MangaResult;

    /// Create a result with a URL derived from the key and id.
    pub fn manga(key: &str, id: &str, title: &str) -> MangaResult {
        MangaResult::new(key, id, title, format!("https://{}.test/manga/{}/", key, id))
    }

    /// A sitemap `<urlset>` listing `locs`.
    pub fn urlset(locs: &[&str]) -> String {
        let entries: String = locs
            .iter()
            .map(|loc| format!("  <url><loc>{}</loc></url>\n", loc))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</urlset>\n",
            entries
        )
    }

    /// A sitemap index pointing at `sitemaps`.
    pub fn sitemap_index(sitemaps: &[&str]) -> String {
        let entries: String = sitemaps
            .iter()
            .map(|loc| format!("  <sitemap><loc>{}</loc></sitemap>\n", loc))
            .collect();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <sitemapindex xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n{}</sitemapindex>\n",
            entries
        )
    }

    /// Wrap `body` in a minimal HTML document with `title` in `<head>`.
    pub fn html_page(title: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>{}</title></head><body>{}</body></html>",
            title, body
        )
    }
}
